pub mod migrations;
pub mod policy;
pub mod schema;

pub use migrations::*;
pub use policy::*;
pub use schema::*;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, instrument};

use crate::error::AppError;

/// Opens the pool with foreign key enforcement on every connection.
#[instrument]
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    info!("Connecting to SQLite database");
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
/// A fresh in-memory database with the current schema applied. The pool keeps
/// its single connection alive for as long as the pool lives.
pub async fn connect_in_memory() -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::new().in_memory(true).foreign_keys(true))
        .await?;

    migrate_schema(&pool, CURRENT_SCHEMA).await?;

    Ok(pool)
}
