use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::schema::{Attribute, Id, RecipeWithAttributes, User};

// Users

#[derive(Debug, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

impl From<UserCreate> for UserUpdate {
    fn from(value: UserCreate) -> Self {
        Self {
            email: Some(value.email),
            password: Some(value.password),
            name: Some(value.name),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUserCreate {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(value: &User) -> Self {
        Self {
            email: value.email.to_owned(),
            name: value.name.to_owned(),
        }
    }
}

// Tags & ingredients

#[derive(Debug, Clone, Deserialize, Validate, PartialEq)]
pub struct NameInput {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field has between 1 and 255 characters."
    ))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeResponse {
    pub id: Id,
    pub name: String,
}

impl From<&Attribute> for AttributeResponse {
    fn from(value: &Attribute) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
        }
    }
}

// Recipes

#[derive(Debug, Deserialize)]
pub struct RecipeCreate {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<NameInput>>,
    pub ingredients: Option<Vec<NameInput>>,
}

/// Partial recipe write. A `None` relation list leaves the relation untouched,
/// `Some(vec![])` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<NameInput>>,
    pub ingredients: Option<Vec<NameInput>>,
}

impl From<RecipeCreate> for RecipePatch {
    fn from(value: RecipeCreate) -> Self {
        Self {
            title: Some(value.title),
            time_minutes: Some(value.time_minutes),
            price: Some(value.price),
            link: value.link,
            description: value.description,
            tags: value.tags,
            ingredients: value.ingredients,
        }
    }
}

impl Validate for RecipeCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_title(&mut errors, &self.title);
        check_price(&mut errors, &self.price);
        check_fields(&mut errors, self.link.as_deref(), &self.tags, &self.ingredients);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for RecipePatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        if let Some(price) = &self.price {
            check_price(&mut errors, price);
        }
        check_fields(&mut errors, self.link.as_deref(), &self.tags, &self.ingredients);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn check_title(errors: &mut ValidationErrors, title: &str) {
    if title.trim().is_empty() {
        errors.add("title", error("blank", "This field may not be blank."));
    } else if title.chars().count() > 255 {
        errors.add(
            "title",
            error("length", "Ensure this field has no more than 255 characters."),
        );
    }
}

// NUMERIC(5, 2)
fn check_price(errors: &mut ValidationErrors, price: &Decimal) {
    if price.normalize().scale() > 2 {
        errors.add(
            "price",
            error("decimal_places", "Ensure that there are no more than 2 decimal places."),
        );
    } else if price.abs() >= Decimal::new(1000, 0) {
        errors.add(
            "price",
            error("max_digits", "Ensure that there are no more than 5 digits in total."),
        );
    }
}

fn check_fields(
    errors: &mut ValidationErrors,
    link: Option<&str>,
    tags: &Option<Vec<NameInput>>,
    ingredients: &Option<Vec<NameInput>>,
) {
    if link.is_some_and(|link| link.chars().count() > 255) {
        errors.add(
            "link",
            error("length", "Ensure this field has no more than 255 characters."),
        );
    }
    if !names_are_valid(tags) {
        errors.add("tags", error("name", "Each tag needs a name of 1 to 255 characters."));
    }
    if !names_are_valid(ingredients) {
        errors.add(
            "ingredients",
            error("name", "Each ingredient needs a name of 1 to 255 characters."),
        );
    }
}

fn names_are_valid(names: &Option<Vec<NameInput>>) -> bool {
    names
        .iter()
        .flatten()
        .all(|input| input.validate().is_ok() && !input.name.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeResponse {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<AttributeResponse>,
    pub ingredients: Vec<AttributeResponse>,
}

impl From<&RecipeWithAttributes> for RecipeResponse {
    fn from(value: &RecipeWithAttributes) -> Self {
        let recipe = &value.recipe;

        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.to_owned(),
            tags: value.tags.iter().map(AttributeResponse::from).collect(),
            ingredients: value.ingredients.iter().map(AttributeResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeDetailResponse {
    #[serde(flatten)]
    pub recipe: RecipeResponse,
    pub description: String,
    pub image: Option<String>,
}

impl From<&RecipeWithAttributes> for RecipeDetailResponse {
    fn from(value: &RecipeWithAttributes) -> Self {
        Self {
            recipe: RecipeResponse::from(value),
            description: value.recipe.description.to_owned(),
            image: value.recipe.image.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: Id,
    pub image: Option<String>,
}
