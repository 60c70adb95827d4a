//! Postgres connection pool shared by the reference source and the
//! snapshot writer.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// The underlying sqlx error, surfaced verbatim
    #[error("database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Connection parameters are missing or invalid
    #[error("database configuration error: {0}")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    /// `DATABASE_URL` is required; its absence is configuration-fatal.
    /// `DB_MAX_CONNECTIONS` and `DB_ACQUIRE_TIMEOUT_SECS` are optional.
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL not set".to_string()))?;

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let acquire_timeout_secs = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
        })
    }
}

pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "database connection pool established"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_mentions_variable() {
        let err = DbError::Config("DATABASE_URL not set".to_string());
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
