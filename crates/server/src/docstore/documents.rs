//! BSON document shapes and their conversion to and from domain entities.

use bson::DateTime as BsonDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storelens_core::model::{Cart, CartItem, Order, OrderItem, Product, Review, User};
use storelens_core::{
    CartId, CartItemId, CartStatus, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Rating, ReviewId, UserId,
};

use super::DocumentStoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub signup_source: String,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub created_at: BsonDateTime,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    pub added_at: BsonDateTime,
    #[serde(default)]
    pub removed_at: Option<BsonDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub order_date: BsonDateTime,
    pub status: String,
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<OrderItemDoc>,
}

/// An order line, embedded in its [`OrderDoc`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    pub review_date: BsonDateTime,
}

const fn default_true() -> bool {
    true
}

fn corrupt(what: impl std::fmt::Display) -> DocumentStoreError {
    DocumentStoreError::DataCorruption(what.to_string())
}

fn price(value: f64, owner: &str) -> Result<Price, DocumentStoreError> {
    Price::from_f64(value).map_err(|e| corrupt(format!("{owner}: {e}")))
}

// =============================================================================
// Domain -> document
// =============================================================================

impl From<&User> for UserDoc {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.to_string(),
            signup_source: user.signup_source.clone(),
            created_at: BsonDateTime::from_chrono(user.created_at),
        }
    }
}

impl From<&Product> for ProductDoc {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.to_f64(),
            description: product.description.clone(),
            is_active: product.is_active,
            created_at: BsonDateTime::from_chrono(product.created_at),
        }
    }
}

impl From<&Cart> for CartDoc {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id.to_string(),
            user_id: cart.user_id.to_string(),
            created_at: BsonDateTime::from_chrono(cart.created_at),
            status: cart.status.as_str().to_string(),
        }
    }
}

impl From<&CartItem> for CartItemDoc {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            cart_id: item.cart_id.to_string(),
            product_id: item.product_id.to_string(),
            added_at: BsonDateTime::from_chrono(item.added_at),
            removed_at: item.removed_at.map(BsonDateTime::from_chrono),
        }
    }
}

impl From<&Order> for OrderDoc {
    fn from(order: &Order) -> Self {
        use rust_decimal::prelude::ToPrimitive;

        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            order_date: BsonDateTime::from_chrono(order.order_date),
            status: order.status.as_str().to_string(),
            total_amount: order.total_amount.to_f64().unwrap_or_default(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemDoc {
                    id: item.id.to_string(),
                    product_id: item.product_id.to_string(),
                    quantity: i32::try_from(item.quantity).unwrap_or(i32::MAX),
                    unit_price: item.unit_price.to_f64(),
                })
                .collect(),
        }
    }
}

impl From<&Review> for ReviewDoc {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.to_string(),
            user_id: review.user_id.to_string(),
            product_id: review.product_id.to_string(),
            rating: i32::from(review.rating.value()),
            comment: review.comment.clone(),
            review_date: BsonDateTime::from_chrono(review.review_date),
        }
    }
}

// =============================================================================
// Document -> domain
// =============================================================================

impl TryFrom<UserDoc> for User {
    type Error = DocumentStoreError;

    fn try_from(doc: UserDoc) -> Result<Self, Self::Error> {
        let email =
            Email::parse(&doc.email).map_err(|e| corrupt(format!("user {}: {e}", doc.id)))?;
        Ok(Self {
            id: UserId::new(doc.id),
            name: doc.name,
            email,
            signup_source: doc.signup_source,
            created_at: doc.created_at.to_chrono(),
        })
    }
}

impl TryFrom<ProductDoc> for Product {
    type Error = DocumentStoreError;

    fn try_from(doc: ProductDoc) -> Result<Self, Self::Error> {
        let price = price(doc.price, &format!("product {}", doc.id))?;
        Ok(Self {
            id: ProductId::new(doc.id),
            name: doc.name,
            category: doc.category,
            price,
            description: doc.description,
            is_active: doc.is_active,
            created_at: doc.created_at.to_chrono(),
        })
    }
}

impl From<CartItemDoc> for CartItem {
    fn from(doc: CartItemDoc) -> Self {
        Self {
            id: CartItemId::new(doc.id),
            cart_id: CartId::new(doc.cart_id),
            product_id: ProductId::new(doc.product_id),
            added_at: doc.added_at.to_chrono(),
            removed_at: doc.removed_at.map(BsonDateTime::to_chrono),
        }
    }
}

impl CartDoc {
    /// Build the cart with its items, which live in their own collection.
    pub fn into_cart(self, items: Vec<CartItem>) -> Result<Cart, DocumentStoreError> {
        let status: CartStatus = self
            .status
            .parse()
            .map_err(|e| corrupt(format!("cart {}: {e}", self.id)))?;
        Ok(Cart {
            id: CartId::new(self.id),
            user_id: UserId::new(self.user_id),
            created_at: self.created_at.to_chrono(),
            status,
            items,
        })
    }
}

impl TryFrom<OrderDoc> for Order {
    type Error = DocumentStoreError;

    fn try_from(doc: OrderDoc) -> Result<Self, Self::Error> {
        let status: OrderStatus = doc
            .status
            .parse()
            .map_err(|e| corrupt(format!("order {}: {e}", doc.id)))?;
        let total_amount = Decimal::try_from(doc.total_amount)
            .map_err(|e| corrupt(format!("order {} total: {e}", doc.id)))?
            .round_dp(2);
        let order_id = OrderId::new(doc.id);

        let items = doc
            .items
            .into_iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity)
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or_else(|| {
                        corrupt(format!("order item {} has quantity {}", item.id, item.quantity))
                    })?;
                Ok(OrderItem {
                    unit_price: price(item.unit_price, &format!("order item {}", item.id))?,
                    id: OrderItemId::new(item.id),
                    order_id: order_id.clone(),
                    product_id: ProductId::new(item.product_id),
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, DocumentStoreError>>()?;

        Ok(Self {
            id: order_id,
            user_id: UserId::new(doc.user_id),
            order_date: doc.order_date.to_chrono(),
            status,
            total_amount,
            items,
        })
    }
}

impl TryFrom<ReviewDoc> for Review {
    type Error = DocumentStoreError;

    fn try_from(doc: ReviewDoc) -> Result<Self, Self::Error> {
        let rating =
            Rating::new(i64::from(doc.rating)).map_err(|e| corrupt(format!("review {}: {e}", doc.id)))?;
        Ok(Self {
            id: ReviewId::new(doc.id),
            user_id: UserId::new(doc.user_id),
            product_id: ProductId::new(doc.product_id),
            rating,
            comment: doc.comment,
            review_date: doc.review_date.to_chrono(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn order() -> Order {
        let order_id = OrderId::new("o1");
        Order {
            id: order_id.clone(),
            user_id: UserId::new("u1"),
            order_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            status: OrderStatus::Completed,
            total_amount: Decimal::new(36_499, 2),
            items: vec![
                OrderItem {
                    id: OrderItemId::new("oi1"),
                    order_id: order_id.clone(),
                    product_id: ProductId::new("p1"),
                    quantity: 1,
                    unit_price: Price::from_cents(34_999),
                },
                OrderItem {
                    id: OrderItemId::new("oi2"),
                    order_id,
                    product_id: ProductId::new("p2"),
                    quantity: 3,
                    unit_price: Price::from_cents(500),
                },
            ],
        }
    }

    #[test]
    fn test_order_embeds_items_and_reads_back() {
        let original = order();
        let doc = OrderDoc::from(&original);
        assert_eq!(doc.items.len(), 2);
        assert!((doc.total_amount - 364.99).abs() < f64::EPSILON);

        let restored = Order::try_from(doc).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.total_amount, restored.items_total());
    }

    #[test]
    fn test_order_doc_bson_shape() {
        let doc = bson::to_document(&OrderDoc::from(&order())).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), "o1");
        assert!(doc.get_datetime("order_date").is_ok());
        let items = doc.get_array("items").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_legacy_active_order_reads_as_pending() {
        let mut doc = OrderDoc::from(&order());
        doc.status = "active".to_string();
        assert_eq!(Order::try_from(doc).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_corrupt_documents_rejected() {
        let mut doc = OrderDoc::from(&order());
        doc.items[0].quantity = 0;
        assert!(matches!(
            Order::try_from(doc),
            Err(DocumentStoreError::DataCorruption(_))
        ));

        let review = ReviewDoc {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            product_id: "p1".to_string(),
            rating: 9,
            comment: None,
            review_date: BsonDateTime::now(),
        };
        assert!(Review::try_from(review).is_err());

        let cart = CartDoc {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            created_at: BsonDateTime::now(),
            status: "lost".to_string(),
        };
        assert!(cart.into_cart(Vec::new()).is_err());
    }

    #[test]
    fn test_product_defaults_when_fields_missing() {
        let doc = bson::doc! {
            "_id": "p1",
            "name": "Lamp",
            "category": "Home",
            "price": 15.0,
            "created_at": BsonDateTime::now(),
        };
        let product: ProductDoc = bson::from_document(doc).unwrap();
        assert!(product.is_active);
        let product = Product::try_from(product).unwrap();
        assert_eq!(product.price, Price::from_cents(1500));
    }

    #[test]
    fn test_seeded_orders_survive_the_mirror_unchanged() {
        use storelens_core::seed::{self, SeedConfig};

        let config = SeedConfig {
            users: 5,
            products: 8,
            orders: 20,
            reviews: 0,
            carts: 0,
            seed: Some(7),
        };
        let snapshot = seed::generate(&config, Utc::now());
        for order in &snapshot.orders {
            let restored = Order::try_from(OrderDoc::from(order)).unwrap();
            assert_eq!(&restored, order);
        }
    }

    #[test]
    fn test_non_finite_price_is_corruption() {
        let doc = bson::doc! {
            "_id": "p1",
            "name": "Lamp",
            "category": "Home",
            "price": f64::NAN,
            "created_at": BsonDateTime::now(),
        };
        let product: ProductDoc = bson::from_document(doc).unwrap();
        assert!(matches!(
            Product::try_from(product),
            Err(DocumentStoreError::DataCorruption(_))
        ));

        let mut order = OrderDoc::from(&order());
        order.items[1].unit_price = f64::INFINITY;
        assert!(matches!(
            Order::try_from(order),
            Err(DocumentStoreError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_removed_cart_item_round_trips() {
        let added = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let item = CartItem {
            id: CartItemId::new("ci1"),
            cart_id: CartId::new("c1"),
            product_id: ProductId::new("p1"),
            added_at: added,
            removed_at: Some(added + chrono::Duration::minutes(5)),
        };
        assert_eq!(CartItem::from(CartItemDoc::from(&item)), item);
    }
}
