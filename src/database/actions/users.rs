use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    config::Config,
    error::ApiError,
    schema::{Id, User},
    serializers::UserUpdate,
};

use sqlx::{Pool, Postgres};

/// Lower-cases the domain part of an address, leaving the local part as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();

    match email.rsplit_once('@') {
        Some((name, domain)) => format!("{name}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password)
        .map_err(|e| ApiError::InternalServerError(format!("Failed to hash password: {e}")))
}

fn email_taken() -> ApiError {
    ApiError::field("email", "A user with this email already exists.")
}

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

async fn insert_user(
    email: &str,
    password: &str,
    name: &str,
    is_staff: bool,
    is_superuser: bool,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::field("email", "Users must have an email address."));
    }

    let password = hash(password)?;

    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, password, name, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO NOTHING RETURNING *;
    ",
    )
    .bind(&email)
    .bind(password)
    .bind(name)
    .bind(is_staff)
    .bind(is_superuser)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => {
            log::info!("Created user {} ({})", user.id, user.email);
            Ok(user)
        }
        None => Err(email_taken()),
    }
}

/// Creates an account, storing the argon2 hash of `password`.
pub async fn create_user(
    email: &str,
    password: &str,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    insert_user(email, password, name, false, false, pool).await
}

pub async fn create_staff_user(
    email: &str,
    password: &str,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    insert_user(email, password, name, true, false, pool).await
}

pub async fn create_superuser(
    email: &str,
    password: &str,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    insert_user(email, password, name, true, true, pool).await
}

pub async fn login_user(
    email: &str,
    password: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let invalid = || ApiError::non_field("Unable to authenticate with provided credentials.");

    let user = get_user(pool, email).await?.ok_or_else(invalid)?;
    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash for user {} is unreadable: {e}", user.id);
        invalid()
    })?;
    if !authenticated || !user.is_active {
        return Err(invalid());
    }

    generate_jwt_session(&user, config)
}

/// Applies the fields present in `update`. Returns `None` when the user is gone.
pub async fn update_user(
    user_id: Id,
    update: UserUpdate,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, ApiError> {
    let email = match update.email.as_deref().map(normalize_email) {
        Some(email) if email.is_empty() => {
            return Err(ApiError::field("email", "This field may not be blank."))
        }
        email => email,
    };
    let password = match update.password.as_deref() {
        Some(password) => Some(hash(password)?),
        None => None,
    };

    let row: Option<User> = sqlx::query_as(
        "
        UPDATE users
        SET email = COALESCE($2, email),
            name = COALESCE($3, name),
            password = COALESCE($4, password)
        WHERE id = $1
        RETURNING *;
    ",
    )
    .bind(user_id)
    .bind(email)
    .bind(update.name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if ApiError::is_unique_violation(&e) {
            email_taken()
        } else {
            ApiError::from(e)
        }
    })?;

    Ok(row)
}

/// Every account ordered by id, optionally narrowed to emails or names containing `search`.
pub async fn list_users(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<User>, ApiError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let rows: Vec<User> = sqlx::query_as(
        "
        SELECT * FROM users
        WHERE $1::TEXT IS NULL OR email ILIKE $1 OR name ILIKE $1
        ORDER BY id
    ",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("test@EXAMPLe.com", "test@example.com")]
    #[case("test2@EXAMPLe.com", "test2@example.com")]
    #[case("Mixed.Case@Example.COM", "Mixed.Case@example.com")]
    #[case("  padded@Example.com ", "padded@example.com")]
    #[case("odd@name@EXAMPLE.com", "odd@name@example.com")]
    #[case("", "")]
    fn email_domain_is_lowercased(#[case] email: &str, #[case] expected: &str) {
        assert_eq!(normalize_email(email), expected);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
