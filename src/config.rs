use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use chrono::Duration;
use log::{info, warn};
use thiserror::Error;

use crate::{cryptography::generate_secret_key, DEFAULT_TOKEN_LIFETIME_HOURS};

#[derive(Debug, Error)]
#[error("Invalid {key} value: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub address: SocketAddr,
    pub secret_key: String,
    pub media_root: PathBuf,
    pub token_lifetime: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::from("postgres://localhost/recipe_api"),
            max_connections: 5,
            address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            secret_key: generate_secret_key(),
            media_root: PathBuf::from("media"),
            token_lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let secret_key = var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY not set, issued tokens will not survive a restart");
            generate_secret_key()
        });

        Ok(Self {
            database_url: try_load("DATABASE_URL", "postgres://localhost/recipe_api")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            address: try_load("RECIPE_API_ADDR", "0.0.0.0:8000")?,
            secret_key,
            media_root: try_load("MEDIA_ROOT", "media")?,
            token_lifetime: Duration::hours(try_load(
                "TOKEN_LIFETIME_HOURS",
                &DEFAULT_TOKEN_LIFETIME_HOURS.to_string(),
            )?),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError {
            key,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_and_reports_bad_ones() {
        let port: Result<u16, _> = try_load("RECIPE_API_TEST_UNSET_PORT", "8080");
        assert_eq!(port.unwrap(), 8080);

        let err = try_load::<u16>("RECIPE_API_TEST_UNSET_PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("RECIPE_API_TEST_UNSET_PORT"));
    }

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();

        assert_eq!(config.token_lifetime, Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));
        assert!(!config.secret_key.is_empty());
    }
}
