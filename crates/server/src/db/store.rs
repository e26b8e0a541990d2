//! `PostgreSQL` adapter for the metric and cart capabilities.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use storelens_core::cart::{AbandonOutcome, CheckoutOutcome, CheckoutPricing, build_order};
use storelens_core::model::{Cart, CartItem, Order, Product, Review, Snapshot, User};
use storelens_core::store::{CartStore, MetricsStore};
use storelens_core::{
    CartId, CartItemId, CartStatus, Price, ProductId, Result as CoreResult, StoreKind, UserId,
};

use super::RepositoryError;
use super::rows::{
    CartItemRow, CartRow, OrderItemRow, OrderRow, ProductRow, ReviewRow, UserRow, assemble_carts,
    assemble_orders,
};

const CART_COLUMNS: &str = "id, user_id, created_at, status";
const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, added_at, removed_at";
const PRODUCT_COLUMNS: &str = "id, name, category, price, description, is_active, created_at";

/// Relational store over a pooled connection.
///
/// Every method acquires its own connection (or transaction) from the pool
/// and releases it before returning.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read every entity, for mirroring into the document store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails or stored data is invalid.
    pub async fn snapshot(&self) -> Result<Snapshot, RepositoryError> {
        let (users, products, carts, orders, reviews) = futures::try_join!(
            self.load_users(),
            self.load_products(),
            self.load_carts(),
            self.load_orders(),
            self.load_reviews(),
        )?;
        Ok(Snapshot {
            users,
            products,
            carts,
            orders,
            reviews,
        })
    }

    async fn load_users(&self) -> Result<Vec<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, signup_source, created_at FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn load_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn load_carts(&self) -> Result<Vec<Cart>, RepositoryError> {
        let carts = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        let items = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items ORDER BY added_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        assemble_carts(carts, items)
    }

    async fn load_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, order_date, status, total_amount FROM orders ORDER BY order_date, id",
        )
        .fetch_all(&self.pool)
        .await?;
        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, quantity, unit_price FROM order_items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        assemble_orders(orders, items)
    }

    async fn load_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, user_id, product_id, rating, comment, review_date FROM reviews ORDER BY review_date, id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Review::try_from)
        .collect()
    }

    async fn load_cart(&self, id: &CartId) -> Result<Option<Cart>, RepositoryError> {
        let Some(cart) = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY added_at, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        cart.into_cart(items.into_iter().map(CartItem::from).collect())
            .map(Some)
    }

    /// Lock the cart, re-check it is active, and write the order with the
    /// status flip in the same transaction.
    async fn checkout_cart(
        &self,
        cart_id: &CartId,
        pricing: &CheckoutPricing,
        at: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1 FOR UPDATE"
        ))
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(CheckoutOutcome::Missing);
        };
        let status = row.status()?;
        if status != CartStatus::Active {
            return Ok(CheckoutOutcome::Closed(status));
        }

        let items = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items \
             WHERE cart_id = $1 AND removed_at IS NULL ORDER BY added_at, id"
        ))
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?;
        let cart = row.into_cart(items.into_iter().map(CartItem::from).collect())?;

        let prices = match pricing {
            CheckoutPricing::Flat(_) => HashMap::new(),
            CheckoutPricing::Catalog => {
                let ids: Vec<String> = cart
                    .current_items()
                    .map(|item| item.product_id.as_str().to_owned())
                    .collect();
                sqlx::query_as::<_, (ProductId, Price)>(
                    "SELECT id, price FROM products WHERE id = ANY($1)",
                )
                .bind(ids)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect()
            }
        };

        let order = build_order(&cart, &prices, pricing, at)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let Some(order) = order else {
            return Ok(CheckoutOutcome::Empty);
        };

        sqlx::query(
            "INSERT INTO orders (id, user_id, order_date, status, total_amount) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.order_date)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE carts SET status = 'converted' WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CheckoutOutcome::Placed(order))
    }

    async fn abandon_cart(&self, cart_id: &CartId) -> Result<AbandonOutcome, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE carts SET status = 'abandoned' WHERE id = $1 AND status = 'active'",
        )
        .bind(cart_id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 1 {
            return Ok(AbandonOutcome::Abandoned);
        }

        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1"
        ))
        .bind(cart_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(AbandonOutcome::Closed(row.status()?)),
            None => Ok(AbandonOutcome::Missing),
        }
    }
}

#[async_trait]
impl MetricsStore for PgStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn ping(&self) -> CoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn users(&self) -> CoreResult<Vec<User>> {
        Ok(self.load_users().await?)
    }

    #[instrument(skip(self))]
    async fn products(&self) -> CoreResult<Vec<Product>> {
        Ok(self.load_products().await?)
    }

    #[instrument(skip(self))]
    async fn carts(&self) -> CoreResult<Vec<Cart>> {
        Ok(self.load_carts().await?)
    }

    #[instrument(skip(self))]
    async fn orders(&self) -> CoreResult<Vec<Order>> {
        Ok(self.load_orders().await?)
    }

    #[instrument(skip(self))]
    async fn reviews(&self) -> CoreResult<Vec<Review>> {
        Ok(self.load_reviews().await?)
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn product(&self, id: &ProductId) -> CoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(row.map(Product::from))
    }

    async fn pick_shopper(&self) -> CoreResult<Option<UserId>> {
        let id = sqlx::query_scalar::<_, UserId>("SELECT id FROM users ORDER BY random() LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(id)
    }

    async fn cart(&self, id: &CartId) -> CoreResult<Option<Cart>> {
        Ok(self.load_cart(id).await?)
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id))]
    async fn create_cart(&self, cart: &Cart) -> CoreResult<()> {
        sqlx::query("INSERT INTO carts (id, user_id, created_at, status) VALUES ($1, $2, $3, $4)")
            .bind(&cart.id)
            .bind(&cart.user_id)
            .bind(cart.created_at)
            .bind(cart.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    #[instrument(skip(self, item), fields(cart_id = %item.cart_id))]
    async fn add_item(&self, item: &CartItem) -> CoreResult<bool> {
        // The status guard and the insert are one statement.
        let inserted = sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, added_at) \
             SELECT $1, $2, $3, $4 \
             WHERE EXISTS (SELECT 1 FROM carts WHERE id = $2 AND status = 'active')",
        )
        .bind(&item.id)
        .bind(&item.cart_id)
        .bind(&item.product_id)
        .bind(item.added_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(inserted.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn remove_item(
        &self,
        cart_id: &CartId,
        item_id: &CartItemId,
        at: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let updated = sqlx::query(
            "UPDATE cart_items SET removed_at = $3 \
             WHERE id = $1 AND cart_id = $2 AND removed_at IS NULL \
             AND EXISTS (SELECT 1 FROM carts WHERE id = $2 AND status = 'active')",
        )
        .bind(item_id)
        .bind(cart_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(updated.rows_affected() == 1)
    }

    #[instrument(skip(self, pricing))]
    async fn checkout(
        &self,
        cart_id: &CartId,
        pricing: &CheckoutPricing,
        at: DateTime<Utc>,
    ) -> CoreResult<CheckoutOutcome> {
        Ok(self.checkout_cart(cart_id, pricing, at).await?)
    }

    #[instrument(skip(self))]
    async fn abandon(&self, cart_id: &CartId) -> CoreResult<AbandonOutcome> {
        Ok(self.abandon_cart(cart_id).await?)
    }

    #[instrument(skip(self, review), fields(product_id = %review.product_id))]
    async fn add_review(&self, review: &Review) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment, review_date) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&review.id)
        .bind(&review.user_id)
        .bind(&review.product_id)
        .bind(review.rating)
        .bind(review.comment.as_deref())
        .bind(review.review_date)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(())
    }
}
