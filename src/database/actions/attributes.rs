use std::collections::{HashMap, HashSet};

use crate::{
    error::ApiError,
    schema::{Attribute, AttributeKind, Id, LinkedAttribute},
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn list_attributes(
    kind: AttributeKind,
    user_id: Id,
    assigned_only: bool,
    pool: &Pool<Postgres>,
) -> Result<Vec<Attribute>, ApiError> {
    let table = kind.table();
    let join_table = kind.join_table();
    let join_column = kind.join_column();

    let rows: Vec<Attribute> = sqlx::query_as(&format!(
        "
        SELECT a.* FROM {table} a
        WHERE a.user_id = $1
          AND (NOT $2 OR EXISTS (SELECT 1 FROM {join_table} j WHERE j.{join_column} = a.id))
        ORDER BY a.name DESC
    "
    ))
    .bind(user_id)
    .bind(assigned_only)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_all_attributes(
    kind: AttributeKind,
    pool: &Pool<Postgres>,
) -> Result<Vec<Attribute>, ApiError> {
    let rows: Vec<Attribute> =
        sqlx::query_as(&format!("SELECT * FROM {} ORDER BY id", kind.table()))
            .fetch_all(pool)
            .await?;

    Ok(rows)
}

pub async fn rename_attribute(
    kind: AttributeKind,
    id: Id,
    user_id: Id,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, ApiError> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .bind(name.trim())
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if ApiError::is_unique_violation(&e) {
            ApiError::field("name", "An entry with this name already exists.")
        } else {
            ApiError::from(e)
        }
    })?;

    Ok(row)
}

pub async fn delete_attribute(
    kind: AttributeKind,
    id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(query.rows_affected() > 0)
}

/// Returns the user's row called `name`, inserting it first if it doesn't exist.
pub async fn get_or_create_attribute(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    conn: &mut PgConnection,
) -> Result<Attribute, ApiError> {
    let table = kind.table();

    let existing: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT * FROM {table} WHERE user_id = $1 AND name = $2"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = existing {
        return Ok(row);
    }

    // Another request may insert the same name between the lookup and here.
    let row: Attribute = sqlx::query_as(&format!(
        "
        INSERT INTO {table} (user_id, name) VALUES ($1, $2)
        ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
        RETURNING *
    "
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Replaces the recipe's links of this kind with the rows named in `names`.
pub async fn set_recipe_attributes(
    kind: AttributeKind,
    recipe_id: Id,
    user_id: Id,
    names: &[String],
    conn: &mut PgConnection,
) -> Result<Vec<Attribute>, ApiError> {
    let join_table = kind.join_table();
    let join_column = kind.join_column();

    sqlx::query(&format!("DELETE FROM {join_table} WHERE recipe_id = $1"))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let mut seen = HashSet::new();
    let mut attached = vec![];
    for name in names.iter().map(|n| n.trim()) {
        if !seen.insert(name) {
            continue;
        }

        let row = get_or_create_attribute(kind, user_id, name, conn).await?;
        sqlx::query(&format!(
            "INSERT INTO {join_table} (recipe_id, {join_column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(recipe_id)
        .bind(row.id)
        .execute(&mut *conn)
        .await?;

        attached.push(row);
    }

    Ok(attached)
}

/// Linked rows for each of `recipe_ids`, ordered by name.
pub async fn list_linked_attributes(
    kind: AttributeKind,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Attribute>>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let table = kind.table();
    let join_table = kind.join_table();
    let join_column = kind.join_column();

    let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
        "
        SELECT j.recipe_id AS recipe_id, a.id AS id, a.user_id AS user_id, a.name AS name
        FROM {join_table} j
        INNER JOIN {table} a ON a.id = j.{join_column}
        WHERE j.recipe_id = ANY($1)
        ORDER BY a.name, a.id
    "
    ))
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut hashmap: HashMap<Id, Vec<Attribute>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap
            .entry(row.recipe_id)
            .or_default()
            .push(row.into())
    });

    Ok(hashmap)
}
