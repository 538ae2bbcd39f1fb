use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::Config, error::ApiError};

/// Shared by every request handler.
#[derive(Clone)]
pub struct State {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl State {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub async fn connect(config: Config) -> Result<Self, ApiError> {
        log::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self::new(pool, config))
    }

    /// State whose pool only connects once a query runs.
    pub fn lazy(config: Config) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(&config.database_url)?;

        Ok(Self::new(pool, config))
    }

    pub async fn migrate(&self) -> Result<(), ApiError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Query(e.into()))?;
        log::info!("Database migrations applied");

        Ok(())
    }
}
