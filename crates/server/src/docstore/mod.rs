//! Document store operations (`MongoDB`).
//!
//! # Collections
//!
//! - `users`, `products`, `carts`, `cart_items`, `reviews` - one document per relational row
//! - `orders` - orders with their items embedded under `items`
//!
//! Documents use the relational id as `_id`, so a mirrored record can be
//! matched across stores. Money is stored as doubles and read back rounded to
//! cents.
//!
//! The document store is read-only at request time: the cart write path
//! goes to `PostgreSQL`, and `storelens-cli mirror` copies it across.

pub mod documents;
pub mod mirror;
mod store;

use std::time::Duration;

use mongodb::options::ClientOptions;
use secrecy::ExposeSecret;
use thiserror::Error;

use storelens_core::{Error as CoreError, StoreKind};

use crate::config::MongoConfig;

pub use store::MongoStore;

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const CARTS: &str = "carts";
    pub const CART_ITEMS: &str = "cart_items";
    pub const ORDERS: &str = "orders";
    pub const REVIEWS: &str = "reviews";

    /// Every collection, parents first.
    pub const ALL: [&str; 6] = [USERS, PRODUCTS, CARTS, CART_ITEMS, ORDERS, REVIEWS];
}

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// Driver error (connection, query, server selection timeout).
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A stored document violates a domain invariant.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<DocumentStoreError> for CoreError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::Mongo(e) => Self::unavailable(StoreKind::Document, e),
            DocumentStoreError::DataCorruption(msg) => Self::Corrupt(msg),
        }
    }
}

/// Connect to the configured document database.
///
/// The driver connects lazily; a down server surfaces on the first query,
/// bounded by a short server selection timeout.
///
/// # Errors
///
/// Returns `DocumentStoreError::Mongo` if the URI cannot be parsed.
pub async fn connect(config: &MongoConfig) -> Result<MongoStore, DocumentStoreError> {
    let mut options = ClientOptions::parse(config.uri.expose_secret()).await?;
    options.app_name = Some("storelens".to_string());
    options.server_selection_timeout = Some(Duration::from_secs(5));
    options.connect_timeout = Some(Duration::from_secs(5));
    options.max_pool_size = Some(10);

    let client = mongodb::Client::with_options(options)?;
    Ok(MongoStore::new(client.database(&config.database)))
}

/// Connect to the document database if one is configured.
///
/// A configuration the driver rejects (a malformed URI, an SRV record that
/// does not resolve) is logged and treated as not configured, so the
/// relational side keeps serving.
pub async fn connect_optional(config: Option<&MongoConfig>) -> Option<MongoStore> {
    let Some(config) = config else {
        tracing::warn!("STORELENS_MONGODB_URI not set; document store disabled");
        return None;
    };
    match connect(config).await {
        Ok(store) => {
            tracing::info!(database = %config.database, "Document store client created");
            Some(store)
        }
        Err(e) => {
            tracing::error!(error = %e, "Document store misconfigured; document store disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(uri: &str) -> MongoConfig {
        MongoConfig {
            uri: SecretString::from(uri.to_string()),
            database: "storelens_test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unparseable_uri_disables_document_store() {
        assert!(connect_optional(Some(&config("not-a-mongodb-uri"))).await.is_none());
        assert!(connect_optional(None).await.is_none());
    }

    #[tokio::test]
    async fn test_valid_uri_connects_lazily() {
        let store = connect_optional(Some(&config("mongodb://127.0.0.1:1"))).await;
        assert!(store.is_some());
    }

    #[test]
    fn test_corruption_maps_to_core_corrupt() {
        let err: CoreError = DocumentStoreError::DataCorruption("order o1".to_string()).into();
        assert!(matches!(err, CoreError::Corrupt(_)));
    }

    #[test]
    fn test_collection_names_unique() {
        let mut names = collections::ALL.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), collections::ALL.len());
    }
}
