//! PostgreSQL persistence for the document model.
//!
//! Rows store `status` as SMALLINT 0/1 and every timestamp as BIGINT epoch
//! milliseconds. Repositories apply the same validation and reference rules
//! as `docbase_core::store::ModelStore`, and append an `operation_log` row in
//! the same transaction as every mutation.

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

use crate::config::DbConfig;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from configuration.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Run a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
