use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Storage-level failures; engine errors never travel further than this type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Timed out waiting for a pooled connection")]
    PoolTimeout,

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StorageError::PoolTimeout,
            sqlx::Error::PoolClosed => StorageError::PoolClosed,
            sqlx::Error::Database(db) if db.is_unique_violation() || db.is_check_violation() => {
                StorageError::Constraint(db.message().to_string())
            }
            other => StorageError::Sqlx(other),
        }
    }
}

/// Builds the connection pool shared by every unit of work
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|_| StorageError::InvalidDatabaseUrl(config.url.clone()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await?;

        info!(
            "Created database pool for {} (max {} connections)",
            config.url, config.max_connections
        );
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
