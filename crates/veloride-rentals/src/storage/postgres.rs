use crate::config::DatabaseConfig;
use crate::error::{RentalError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Shared Postgres connection pool for all SQL-backed stores.
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| RentalError::store_unavailable("connect", e))?;

        info!(max_connections = config.max_connections, "connected to database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RentalError::store_unavailable("migrate", e))?;

        info!("database migrations completed");
        Ok(())
    }
}
