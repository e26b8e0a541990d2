//! Copy the relational store into the document store.
//!
//! # Usage
//!
//! ```bash
//! storelens mirror
//! ```
//!
//! Every collection is replaced wholesale; orders are written with their
//! items embedded. Run it after any change to the relational data that the
//! document side of a comparison should see.

use tracing::info;

use storelens_server::db::PgStore;
use storelens_server::docstore::mirror;

use super::{CliError, connect_document, connect_relational, load_config};

/// Read everything from `PostgreSQL` and replace the `MongoDB` collections with it.
///
/// # Errors
///
/// Returns an error if either store is unreachable or the document store is
/// not configured.
pub async fn run() -> Result<(), CliError> {
    let config = load_config()?;
    let pool = connect_relational(&config).await?;
    let document = connect_document(&config).await?;

    let snapshot = PgStore::new(pool).snapshot().await?;
    info!(
        users = snapshot.users.len(),
        products = snapshot.products.len(),
        orders = snapshot.orders.len(),
        "Read relational snapshot"
    );

    let report = mirror::mirror(&document, &snapshot).await?;
    info!(?report, "Mirror complete");
    Ok(())
}
