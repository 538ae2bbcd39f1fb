use std::collections::HashMap;

use crate::{
    actions::attributes::{list_linked_attributes, set_recipe_attributes},
    error::ApiError,
    schema::{AttributeKind, Id, Recipe, RecipeWithAttributes},
    serializers::{NameInput, RecipeCreate, RecipePatch},
};

use sqlx::{PgConnection, Pool, Postgres};

/// Optional `?tags=1,2&ingredients=3` narrowing of the recipe list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        // An empty parameter (`?tags=`) doesn't filter.
        let parse = |kind: AttributeKind| {
            query
                .get(kind.field())
                .map(|raw| parse_id_list(kind.field(), raw))
                .transpose()
                .map(|ids| ids.filter(|ids| !ids.is_empty()))
        };

        Ok(Self {
            tags: parse(AttributeKind::Tag)?,
            ingredients: parse(AttributeKind::Ingredient)?,
        })
    }
}

/// Parses a comma separated id list such as `"1,2, 3"`. Empty items are skipped.
pub fn parse_id_list(field: &str, raw: &str) -> Result<Vec<Id>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Id>()
                .map_err(|_| ApiError::field(field, "Enter a comma separated list of ids."))
        })
        .collect()
}

pub async fn list_recipes(
    user_id: Id,
    filter: &RecipeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT r.* FROM recipes r
        WHERE r.user_id = $1
          AND ($2::INT4[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
          AND ($3::INT4[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
        ORDER BY r.id DESC
    ",
    )
    .bind(user_id)
    .bind(filter.tags.as_deref())
    .bind(filter.ingredients.as_deref())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_all_recipes(pool: &Pool<Postgres>) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<Recipe> = sqlx::query_as("SELECT * FROM recipes ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// The user's recipe with this id. Other users' recipes read as missing.
pub async fn get_recipe(
    id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

fn names(inputs: &[NameInput]) -> Vec<String> {
    inputs.iter().map(|input| input.name.to_owned()).collect()
}

async fn set_relations(
    recipe_id: Id,
    user_id: Id,
    tags: Option<&[NameInput]>,
    ingredients: Option<&[NameInput]>,
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    if let Some(tags) = tags {
        set_recipe_attributes(AttributeKind::Tag, recipe_id, user_id, &names(tags), conn).await?;
    }
    if let Some(ingredients) = ingredients {
        set_recipe_attributes(
            AttributeKind::Ingredient,
            recipe_id,
            user_id,
            &names(ingredients),
            conn,
        )
        .await?;
    }

    Ok(())
}

pub async fn create_recipe(
    user_id: Id,
    recipe: RecipeCreate,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let mut tx = pool.begin().await?;

    let row: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price, link, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
    ",
    )
    .bind(user_id)
    .bind(recipe.title.trim())
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(recipe.link.as_deref().unwrap_or_default())
    .bind(recipe.description.as_deref().unwrap_or_default())
    .fetch_one(&mut *tx)
    .await?;

    set_relations(
        row.id,
        user_id,
        recipe.tags.as_deref(),
        recipe.ingredients.as_deref(),
        &mut tx,
    )
    .await?;

    tx.commit().await?;
    log::info!("User {user_id} created recipe {}", row.id);

    Ok(row)
}

/// Applies `patch` to the user's recipe. `None` when no such recipe belongs to the user.
pub async fn update_recipe(
    id: Id,
    user_id: Id,
    patch: RecipePatch,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, ApiError> {
    let mut tx = pool.begin().await?;

    let row: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes
        SET title = COALESCE($3, title),
            time_minutes = COALESCE($4, time_minutes),
            price = COALESCE($5, price),
            link = COALESCE($6, link),
            description = COALESCE($7, description)
        WHERE id = $1 AND user_id = $2
        RETURNING *
    ",
    )
    .bind(id)
    .bind(user_id)
    .bind(patch.title.as_deref().map(str::trim))
    .bind(patch.time_minutes)
    .bind(patch.price)
    .bind(patch.link.as_deref())
    .bind(patch.description.as_deref())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    set_relations(
        row.id,
        user_id,
        patch.tags.as_deref(),
        patch.ingredients.as_deref(),
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    Ok(Some(row))
}

/// Deletes the user's recipe and returns it, or `None` if it wasn't theirs.
pub async fn delete_recipe(
    id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> =
        sqlx::query_as("DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

/// Points the recipe at a new image. Returns the previous image path, or `None` when the
/// recipe doesn't belong to the user.
pub async fn set_recipe_image(
    id: Id,
    user_id: Id,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Option<String>>, ApiError> {
    let row: Option<(Option<String>,)> = sqlx::query_as(
        "
        UPDATE recipes r SET image = $3
        FROM (SELECT id, image FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE) old
        WHERE r.id = old.id
        RETURNING old.image
    ",
    )
    .bind(id)
    .bind(user_id)
    .bind(image)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0))
}

/// Loads tags and ingredients for each recipe, keeping the input order.
pub async fn with_attributes(
    recipes: Vec<Recipe>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeWithAttributes>, ApiError> {
    let ids: Vec<Id> = recipes.iter().map(|r| r.id).collect();
    let mut tags = list_linked_attributes(AttributeKind::Tag, &ids, pool).await?;
    let mut ingredients = list_linked_attributes(AttributeKind::Ingredient, &ids, pool).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeWithAttributes {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}
