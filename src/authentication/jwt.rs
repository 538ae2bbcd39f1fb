use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::config::Config;
use crate::database::error::ApiError;
use crate::database::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user: &User, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: user.id,
            email: user.email.to_owned(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            role: UserRole::from_flags(value.is_staff, value.is_superuser),
            user_id: value.user_id,
            email: value.email,
        }
    }
}

impl From<&User> for SessionData {
    fn from(value: &User) -> Self {
        SessionData {
            role: value.role(),
            user_id: value.id,
            email: value.email.to_owned(),
        }
    }
}

fn signing_key(config: &Config) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(config.secret_key.as_bytes())
        .map_err(|e| ApiError::InternalServerError(format!("Invalid signing key: {e}")))
}

pub fn generate_jwt_session(user: &User, config: &Config) -> Result<String, ApiError> {
    let key = signing_key(config)?;
    let claims = JwtSessionData::new(user, config.token_lifetime);

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::InternalServerError(format!("Failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, config: &Config) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(config)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::InvalidSession(String::from("Invalid token.")))?;

    if session.is_expired() {
        return Err(ApiError::InvalidSession(String::from("Token has expired.")));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_staff: bool) -> User {
        User {
            id: 7,
            email: String::from("test@example.com"),
            name: String::from("Test"),
            password: String::new(),
            is_active: true,
            is_staff,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn signed_session_verifies() {
        let config = Config::default();
        let token = generate_jwt_session(&user(true), &config).unwrap();
        let session: SessionData = verify_jwt_session(&token, &config).unwrap().into();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.email, "test@example.com");
        assert_eq!(session.role, UserRole::Staff);
    }

    #[test]
    fn session_from_account_uses_current_flags() {
        let mut account = user(false);
        account.is_superuser = true;

        assert_eq!(SessionData::from(&account).role, UserRole::Superuser);
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let token = generate_jwt_session(&user(false), &Config::default()).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, &Config::default()),
            Err(ApiError::InvalidSession(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = Config {
            token_lifetime: Duration::seconds(-1),
            ..Config::default()
        };
        let token = generate_jwt_session(&user(false), &config).unwrap();

        match verify_jwt_session(&token, &config) {
            Err(ApiError::InvalidSession(reason)) => assert!(reason.contains("expired")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
