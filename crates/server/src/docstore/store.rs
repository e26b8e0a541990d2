//! `MongoDB` adapter for the metric capability.

use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use serde::de::DeserializeOwned;
use tracing::instrument;

use storelens_core::model::{Cart, CartItem, Order, Product, Review, User};
use storelens_core::store::MetricsStore;
use storelens_core::{Result as CoreResult, StoreKind};

use super::DocumentStoreError;
use super::collections;
use super::documents::{CartDoc, CartItemDoc, OrderDoc, ProductDoc, ReviewDoc, UserDoc};

/// Document store over a pooled client.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Create a store over `db`.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    pub(super) fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Read a whole collection in `_id` order.
    async fn find_all<T>(&self, name: &str) -> Result<Vec<T>, DocumentStoreError>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        let cursor = self
            .collection::<T>(name)
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn load_carts(&self) -> Result<Vec<Cart>, DocumentStoreError> {
        let (carts, items) = futures::try_join!(
            self.find_all::<CartDoc>(collections::CARTS),
            self.find_all::<CartItemDoc>(collections::CART_ITEMS),
        )?;

        let mut by_cart: std::collections::HashMap<String, Vec<CartItem>> =
            std::collections::HashMap::new();
        for item in items {
            by_cart
                .entry(item.cart_id.clone())
                .or_default()
                .push(CartItem::from(item));
        }
        carts
            .into_iter()
            .map(|cart| {
                let mut items = by_cart.remove(&cart.id).unwrap_or_default();
                items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.id.cmp(&b.id)));
                cart.into_cart(items)
            })
            .collect()
    }
}

fn convert<D, T>(docs: Vec<D>) -> Result<Vec<T>, DocumentStoreError>
where
    T: TryFrom<D, Error = DocumentStoreError>,
{
    docs.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl MetricsStore for MongoStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn ping(&self) -> CoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DocumentStoreError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn users(&self) -> CoreResult<Vec<User>> {
        let docs = self.find_all::<UserDoc>(collections::USERS).await?;
        Ok(convert(docs)?)
    }

    #[instrument(skip(self))]
    async fn products(&self) -> CoreResult<Vec<Product>> {
        let docs = self.find_all::<ProductDoc>(collections::PRODUCTS).await?;
        Ok(convert(docs)?)
    }

    #[instrument(skip(self))]
    async fn carts(&self) -> CoreResult<Vec<Cart>> {
        Ok(self.load_carts().await?)
    }

    #[instrument(skip(self))]
    async fn orders(&self) -> CoreResult<Vec<Order>> {
        let docs = self.find_all::<OrderDoc>(collections::ORDERS).await?;
        Ok(convert(docs)?)
    }

    #[instrument(skip(self))]
    async fn reviews(&self) -> CoreResult<Vec<Review>> {
        let docs = self.find_all::<ReviewDoc>(collections::REVIEWS).await?;
        Ok(convert(docs)?)
    }
}
