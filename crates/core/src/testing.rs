//! Fixture builders for unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{Cart, CartItem, Order, OrderItem, Product, Review, User};
use crate::types::{
    CartId, CartItemId, CartStatus, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Rating, ReviewId, UserId,
};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: UserId::new(id),
        name: name.to_owned(),
        email: Email::parse(&format!("{id}@example.com")).unwrap(),
        signup_source: "organic".to_owned(),
        created_at: at(2024, 1, 1, 0),
    }
}

pub fn product(id: &str, name: &str, cents: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        category: "Home".to_owned(),
        price: Price::from_cents(cents),
        description: None,
        is_active: true,
        created_at: at(2024, 1, 1, 0),
    }
}

/// An order whose total matches its `(product, quantity, unit cents)` lines.
pub fn order(
    id: &str,
    user_id: &str,
    date: DateTime<Utc>,
    status: OrderStatus,
    lines: &[(&str, u32, u32)],
) -> Order {
    let order_id = OrderId::new(id);
    let items: Vec<OrderItem> = lines
        .iter()
        .enumerate()
        .map(|(n, (product_id, quantity, cents))| OrderItem {
            id: OrderItemId::new(format!("{id}-{n}")),
            order_id: order_id.clone(),
            product_id: ProductId::new(*product_id),
            quantity: *quantity,
            unit_price: Price::from_cents(*cents),
        })
        .collect();
    let total_amount = items.iter().map(OrderItem::line_total).sum();
    Order {
        id: order_id,
        user_id: UserId::new(user_id),
        order_date: date,
        status,
        total_amount,
        items,
    }
}

/// A cart holding one item per `(product, removed)` entry.
pub fn cart(id: &str, user_id: &str, status: CartStatus, items: &[(&str, bool)]) -> Cart {
    let cart_id = CartId::new(id);
    let added = at(2024, 3, 1, 12);
    Cart {
        id: cart_id.clone(),
        user_id: UserId::new(user_id),
        created_at: added,
        status,
        items: items
            .iter()
            .enumerate()
            .map(|(n, (product_id, removed))| CartItem {
                id: CartItemId::new(format!("{id}-{n}")),
                cart_id: cart_id.clone(),
                product_id: ProductId::new(*product_id),
                added_at: added,
                removed_at: removed.then_some(added),
            })
            .collect(),
    }
}

pub fn review(id: &str, user_id: &str, product_id: &str, rating: i64) -> Review {
    Review {
        id: ReviewId::new(id),
        user_id: UserId::new(user_id),
        product_id: ProductId::new(product_id),
        rating: Rating::new(rating).unwrap(),
        comment: None,
        review_date: at(2024, 3, 2, 9),
    }
}
