//! Relational store operations (`PostgreSQL`).
//!
//! # Tables
//!
//! - `users` - Shoppers
//! - `products` - Catalog, with `is_active` for retired products
//! - `carts` / `cart_items` - Carts and their soft-deleted items
//! - `orders` / `order_items` - Placed orders
//! - `reviews` - Product ratings
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p storelens-cli -- migrate
//! ```

mod rows;
pub mod seed;
mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use storelens_core::{Error as CoreError, StoreKind};

pub use store::PgStore;

/// Errors that can occur during relational store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::unavailable(StoreKind::Relational, e),
            RepositoryError::DataCorruption(msg) => Self::Corrupt(msg),
            RepositoryError::NotFound(what) => Self::NotFound(what),
            RepositoryError::Conflict(msg) => Self::Validation(msg),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_core_taxonomy() {
        let err: CoreError = RepositoryError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(
            err,
            CoreError::DataUnavailable {
                store: StoreKind::Relational,
                ..
            }
        ));

        let err: CoreError = RepositoryError::DataCorruption("bad status".to_string()).into();
        assert!(matches!(err, CoreError::Corrupt(_)));

        let err: CoreError = RepositoryError::Conflict("email".to_string()).into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
