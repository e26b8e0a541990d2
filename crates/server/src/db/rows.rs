//! Row shapes read from `PostgreSQL` and their conversion to domain entities.
//!
//! Statuses and ratings are read as plain columns and validated here, so a
//! value outside its domain surfaces as `DataCorruption` instead of a decode
//! failure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use storelens_core::model::{Cart, CartItem, Order, OrderItem, Product, Review, User};
use storelens_core::{
    CartId, CartItemId, CartStatus, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Rating, ReviewId, UserId,
};

use super::RepositoryError;

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub signup_source: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for user {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            signup_source: row.signup_source,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CartRow {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

impl CartRow {
    pub fn status(&self) -> Result<CartStatus, RepositoryError> {
        self.status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("cart {}: {e}", self.id)))
    }

    pub fn into_cart(self, items: Vec<CartItem>) -> Result<Cart, RepositoryError> {
        let status = self.status()?;
        Ok(Cart {
            id: self.id,
            user_id: self.user_id,
            created_at: self.created_at,
            status,
            items,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CartItemRow {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            added_at: row.added_at,
            removed_at: row.removed_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub total_amount: Decimal,
}

impl OrderRow {
    pub fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", self.id)))?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            order_date: self.order_date,
            status,
            total_amount: self.total_amount,
            items,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct OrderItemRow {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Price,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order item {} has quantity {}",
                    row.id, row.quantity
                ))
            })?;
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity,
            unit_price: row.unit_price,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: i16,
    pub comment: Option<String>,
    pub review_date: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("review {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            rating,
            comment: row.comment,
            review_date: row.review_date,
        })
    }
}

/// Group child rows by their parent key.
pub fn group_by<K, C>(children: Vec<C>, key: impl Fn(&C) -> K) -> HashMap<K, Vec<C>>
where
    K: std::hash::Hash + Eq,
{
    let mut grouped: HashMap<K, Vec<C>> = HashMap::new();
    for child in children {
        grouped.entry(key(&child)).or_default().push(child);
    }
    grouped
}

/// Assemble orders from their rows.
pub fn assemble_orders(
    orders: Vec<OrderRow>,
    items: Vec<OrderItemRow>,
) -> Result<Vec<Order>, RepositoryError> {
    let mut items = group_by(items, |item| item.order_id.clone());
    orders
        .into_iter()
        .map(|row| {
            let lines = items
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(OrderItem::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            row.into_order(lines)
        })
        .collect()
}

/// Assemble carts from their rows.
pub fn assemble_carts(
    carts: Vec<CartRow>,
    items: Vec<CartItemRow>,
) -> Result<Vec<Cart>, RepositoryError> {
    let mut items = group_by(items, |item| item.cart_id.clone());
    carts
        .into_iter()
        .map(|row| {
            let lines = items
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(CartItem::from)
                .collect();
            row.into_cart(lines)
        })
        .collect()
}
