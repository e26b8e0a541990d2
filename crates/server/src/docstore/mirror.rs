//! Copying relational data into the document store.
//!
//! A mirror replaces every collection's contents with the given snapshot and
//! (re)creates the secondary indexes. The stores are never assumed to be in
//! sync between mirrors.

use bson::doc;
use mongodb::IndexModel;
use mongodb::options::IndexOptions;
use serde::Serialize;
use tracing::info;

use storelens_core::model::Snapshot;

use super::documents::{CartDoc, CartItemDoc, OrderDoc, ProductDoc, ReviewDoc, UserDoc};
use super::{DocumentStoreError, MongoStore, collections};

/// Documents written per collection by a mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub users: usize,
    pub products: usize,
    pub carts: usize,
    pub cart_items: usize,
    pub orders: usize,
    pub reviews: usize,
}

/// Replace the document store's contents with `snapshot`.
///
/// # Errors
///
/// Returns `DocumentStoreError::Mongo` if a write fails. Collections written
/// before the failure keep their new contents.
pub async fn mirror(store: &MongoStore, snapshot: &Snapshot) -> Result<MirrorReport, DocumentStoreError> {
    clear(store).await?;

    let cart_items: Vec<CartItemDoc> = snapshot
        .carts
        .iter()
        .flat_map(|cart| cart.items.iter().map(CartItemDoc::from))
        .collect();

    let report = MirrorReport {
        users: replace(store, collections::USERS, snapshot.users.iter().map(UserDoc::from)).await?,
        products: replace(
            store,
            collections::PRODUCTS,
            snapshot.products.iter().map(ProductDoc::from),
        )
        .await?,
        carts: replace(store, collections::CARTS, snapshot.carts.iter().map(CartDoc::from)).await?,
        cart_items: replace(store, collections::CART_ITEMS, cart_items).await?,
        orders: replace(store, collections::ORDERS, snapshot.orders.iter().map(OrderDoc::from))
            .await?,
        reviews: replace(
            store,
            collections::REVIEWS,
            snapshot.reviews.iter().map(ReviewDoc::from),
        )
        .await?,
    };

    ensure_indexes(store).await?;
    info!(?report, "document store mirrored");
    Ok(report)
}

async fn replace<T>(
    store: &MongoStore,
    name: &str,
    docs: impl IntoIterator<Item = T>,
) -> Result<usize, DocumentStoreError>
where
    T: Serialize + Send + Sync,
{
    let docs: Vec<T> = docs.into_iter().collect();
    // insert_many rejects an empty batch.
    if docs.is_empty() {
        return Ok(0);
    }
    let result = store.collection::<T>(name).insert_many(&docs).await?;
    Ok(result.inserted_ids.len())
}

/// Create the secondary indexes the metric reads rely on.
///
/// # Errors
///
/// Returns `DocumentStoreError::Mongo` if index creation fails.
pub async fn ensure_indexes(store: &MongoStore) -> Result<(), DocumentStoreError> {
    let indexes: [(&str, bson::Document, bool); 7] = [
        (collections::USERS, doc! { "email": 1 }, true),
        (collections::PRODUCTS, doc! { "category": 1 }, false),
        (collections::ORDERS, doc! { "user_id": 1 }, false),
        (collections::ORDERS, doc! { "order_date": -1 }, false),
        (collections::REVIEWS, doc! { "product_id": 1, "rating": -1 }, false),
        (collections::CARTS, doc! { "user_id": 1 }, false),
        (collections::CART_ITEMS, doc! { "cart_id": 1 }, false),
    ];

    for (collection, keys, unique) in indexes {
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        store
            .collection::<bson::Document>(collection)
            .create_index(model)
            .await?;
    }
    Ok(())
}

/// Drop every StoreLens collection.
///
/// # Errors
///
/// Returns `DocumentStoreError::Mongo` if a drop fails.
pub async fn clear(store: &MongoStore) -> Result<(), DocumentStoreError> {
    for name in collections::ALL {
        store.collection::<bson::Document>(name).drop().await?;
    }
    info!(collections = collections::ALL.len(), "document store cleared");
    Ok(())
}
