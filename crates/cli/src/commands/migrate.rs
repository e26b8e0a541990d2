//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! storelens migrate
//! ```
//!
//! Applies `crates/server/migrations/` to `STORELENS_DATABASE_URL`: the store
//! schema and the `tower_sessions` table. The document store needs no
//! migration; its indexes are created by `storelens mirror`.

use tracing::info;

use storelens_server::db;

use super::{CliError, connect_relational, load_config};

/// Run the relational store migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let config = load_config()?;
    let pool = connect_relational(&config).await?;

    info!("Running migrations...");
    db::run_migrations(&pool).await?;
    info!("Migrations complete");
    Ok(())
}
