pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Schemes accepted in the `Authorization` header.
pub const AUTH_SCHEMES: &[&str] = &["Token", "Bearer"];

pub const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;
pub const MAX_JSON_SIZE: u64 = 64 * 1024;
