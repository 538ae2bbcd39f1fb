pub mod attributes;
pub mod recipes;
pub mod users;
