//! Remove all StoreLens data.
//!
//! # Usage
//!
//! ```bash
//! # Both stores
//! storelens cleanup
//!
//! # Only one side
//! storelens cleanup --only relational
//! storelens cleanup --only document
//! ```
//!
//! The relational schema and the session table are kept; document
//! collections are dropped and recreated by the next mirror.

use tracing::info;

use storelens_core::StoreKind;
use storelens_server::db;
use storelens_server::docstore::mirror;

use super::{CliError, connect_document, connect_relational, load_config};

/// Delete the data of one store, or both when `only` is `None`.
///
/// # Errors
///
/// Returns an error if a targeted store is unreachable or not configured.
pub async fn run(only: Option<StoreKind>) -> Result<(), CliError> {
    let config = load_config()?;

    if only != Some(StoreKind::Document) {
        let pool = connect_relational(&config).await?;
        db::seed::clear(&pool).await?;
    }
    if only != Some(StoreKind::Relational) {
        let store = connect_document(&config).await?;
        mirror::clear(&store).await?;
    }

    info!("Cleanup complete");
    Ok(())
}
