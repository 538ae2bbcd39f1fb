use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Eq, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Staff,
    Superuser,
}

impl UserRole {
    pub fn from_flags(is_staff: bool, is_superuser: bool) -> Self {
        match (is_staff, is_superuser) {
            (_, true) => UserRole::Superuser,
            (true, false) => UserRole::Staff,
            (false, false) => UserRole::User,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from_flags(self.is_staff, self.is_superuser)
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
    pub image: Option<String>,
}

/// Row shape shared by tags and ingredients.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Attribute {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

pub type Tag = Attribute;
pub type Ingredient = Attribute;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedAttribute {
    pub recipe_id: Id,
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

impl From<LinkedAttribute> for Attribute {
    fn from(value: LinkedAttribute) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecipeWithAttributes {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

/// Which of the two name-keyed recipe relations an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub fn join_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn join_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Key used for this relation in payloads and query strings.
    pub fn field(self) -> &'static str {
        self.table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, false, UserRole::User)]
    #[case(true, false, UserRole::Staff)]
    #[case(true, true, UserRole::Superuser)]
    #[case(false, true, UserRole::Superuser)]
    fn role_from_flags(#[case] is_staff: bool, #[case] is_superuser: bool, #[case] role: UserRole) {
        assert_eq!(UserRole::from_flags(is_staff, is_superuser), role);
    }

    #[test]
    fn attribute_tables_line_up() {
        assert_eq!(AttributeKind::Tag.join_table(), "recipe_tags");
        assert_eq!(AttributeKind::Ingredient.join_column(), "ingredient_id");
        assert_eq!(AttributeKind::Ingredient.field(), "ingredients");
    }
}
