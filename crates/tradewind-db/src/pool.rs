//! Connection pool construction.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::DbError;

/// Connect to PostgreSQL with sensible pool defaults for an API service.
///
/// # Errors
///
/// Returns `DbError::ConnectionFailed` if the initial connection attempt fails.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(DbError::ConnectionFailed)
}
