//! Domain entities, shared by every store adapter.
//!
//! The relational and document layouts differ (orders embed their items in
//! the document store, cart items live in their own table/collection in both)
//! but adapters always hand the engine these shapes.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    CartId, CartItemId, CartStatus, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Rating, ReviewId, UserId,
};

/// The current time at millisecond precision.
///
/// BSON dates keep milliseconds while `PostgreSQL` keeps microseconds; entity
/// timestamps are created at the coarser precision so both stores hold the
/// same instant.
#[must_use]
pub fn now() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

/// Drop sub-millisecond precision from `at`.
#[must_use]
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

/// A registered shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    /// Acquisition channel (`organic`, `referral`, `social`, `paid`).
    pub signup_source: String,
    pub created_at: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A shopping cart with every item ever added, removed ones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: CartStatus,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// A new, empty, active cart.
    #[must_use]
    pub fn open(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            created_at,
            status: CartStatus::Active,
            items: Vec::new(),
        }
    }

    /// Items not logically removed.
    pub fn current_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|item| item.is_current())
    }
}

/// A line added to a cart. Removal is logical: `removed_at` is set, the row stays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

impl CartItem {
    /// Whether the item is still in the cart.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.removed_at.is_none()
    }
}

/// A placed order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Σ quantity × unit price over the line items.
    #[must_use]
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderItem {
    /// quantity × unit price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// A product review. Several reviews per (user, product) are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub review_date: DateTime<Utc>,
}

/// Every entity of a store, used for seeding and mirroring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub products: Vec<Product>,
    pub carts: Vec<Cart>,
    pub orders: Vec<Order>,
    pub reviews: Vec<Review>,
}
