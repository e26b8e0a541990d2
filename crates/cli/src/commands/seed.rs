//! Seed the stores with synthetic demo data.
//!
//! # Usage
//!
//! ```bash
//! # Default volumes into PostgreSQL
//! storelens seed
//!
//! # Reproducible data, replacing what is there, copied to MongoDB too
//! storelens seed --seed 7 --clear --mirror
//! ```

use chrono::Utc;
use tracing::info;

use storelens_core::seed::{self, SeedConfig};
use storelens_server::db;
use storelens_server::docstore::mirror;

use super::{CliError, connect_document, connect_relational, load_config};

/// Options for the seed command.
#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    pub volumes: SeedConfig,
    /// Truncate the relational tables first.
    pub clear: bool,
    /// Copy the generated data to the document store afterwards.
    pub mirror: bool,
}

/// Generate a snapshot and write it to the relational store.
///
/// # Errors
///
/// Returns an error if a store is unreachable or rejects the data (for
/// example `Conflict` when seeding twice without `--clear`).
pub async fn run(options: SeedOptions) -> Result<(), CliError> {
    let config = load_config()?;
    let pool = connect_relational(&config).await?;

    let snapshot = seed::generate(&options.volumes, Utc::now());
    info!(
        users = snapshot.users.len(),
        products = snapshot.products.len(),
        orders = snapshot.orders.len(),
        reviews = snapshot.reviews.len(),
        carts = snapshot.carts.len(),
        seed = ?options.volumes.seed,
        "Generated synthetic data"
    );

    if options.clear {
        db::seed::clear(&pool).await?;
    }
    db::seed::write_snapshot(&pool, &snapshot).await?;

    if options.mirror {
        let store = connect_document(&config).await?;
        let report = mirror::mirror(&store, &snapshot).await?;
        info!(?report, "Document store mirrored");
    }

    info!("Seeding complete");
    Ok(())
}
