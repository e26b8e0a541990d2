//! Integration tests for StoreLens.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no databases needed)
//! cargo test -p storelens-integration-tests
//!
//! # Live tests against a running server with seeded stores
//! STORELENS_BASE_URL=http://127.0.0.1:5001 cargo test -p storelens-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `metric_properties` - Catalog metrics over hand-built data
//! - `cart_flow` - Cart state machine through the service and the router
//! - `comparison` - Dual-store comparison with healthy and failing stores
//! - `live_server` - HTTP tests against a running server (ignored by default)
//!
//! This crate provides the shared fixtures: entity builders and a
//! [`TestApp`] that drives the router in-process, carrying the session
//! cookie between requests like a browser.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use storelens_core::cart::{CartService, CheckoutPricing};
use storelens_core::metrics::MetricsEngine;
use storelens_core::model::{Cart, CartItem, Order, OrderItem, Product, Review, Snapshot, User};
use storelens_core::store::InMemoryStore;
use storelens_core::{
    CartId, CartItemId, CartStatus, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Rating, ReviewId, StoreKind, UserId,
};
use storelens_server::state::AppState;

// =============================================================================
// Entity builders
// =============================================================================

/// A UTC timestamp on the hour.
///
/// # Panics
///
/// Panics on an impossible date.
#[must_use]
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// A user with an `@example.com` address.
///
/// # Panics
///
/// Panics if `id` does not form a valid email local part.
#[must_use]
pub fn user(id: &str, name: &str) -> User {
    User {
        id: UserId::new(id),
        name: name.to_owned(),
        email: Email::parse(&format!("{id}@example.com")).expect("valid fixture email"),
        signup_source: "organic".to_owned(),
        created_at: at(2024, 1, 1, 0),
    }
}

/// An active product in the `Home` category.
#[must_use]
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
#[must_use]
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

/// A completed order of one unit per product at `cents` each.
#[must_use]
pub fn basket(id: &str, user_id: &str, products: &[&str], cents: u32) -> Order {
    let lines: Vec<(&str, u32, u32)> = products.iter().map(|p| (*p, 1, cents)).collect();
    order(id, user_id, at(2024, 4, 1, 10), OrderStatus::Completed, &lines)
}

/// A cart holding one item per `(product, removed)` entry.
#[must_use]
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

/// A review with a 1-5 rating.
///
/// # Panics
///
/// Panics if `rating` is out of range.
#[must_use]
pub fn review(id: &str, user_id: &str, product_id: &str, rating: i64) -> Review {
    Review {
        id: ReviewId::new(id),
        user_id: UserId::new(user_id),
        product_id: ProductId::new(product_id),
        rating: Rating::new(rating).expect("valid fixture rating"),
        comment: None,
        review_date: at(2024, 3, 2, 9),
    }
}

/// A small catalog with three shoppers and four products.
#[must_use]
pub fn shop() -> Snapshot {
    Snapshot {
        users: vec![user("u1", "Ada"), user("u2", "Bo"), user("u3", "Cy")],
        products: vec![
            product("p1", "Lamp", 1500),
            product("p2", "Rug", 8000),
            product("p3", "Vase", 2500),
            product("p4", "Clock", 4000),
        ],
        ..Snapshot::default()
    }
}

/// An engine over a fresh in-memory store.
#[must_use]
pub fn engine(kind: StoreKind, snapshot: Snapshot) -> (Arc<InMemoryStore>, MetricsEngine) {
    let store = Arc::new(InMemoryStore::from_snapshot(kind, snapshot));
    let engine = MetricsEngine::new(store.clone());
    (store, engine)
}

// =============================================================================
// In-process application
// =============================================================================

/// The router over in-memory stores, with a browser-like cookie.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
    pub relational: Arc<InMemoryStore>,
    pub document: Option<Arc<InMemoryStore>>,
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// App whose relational store holds `snapshot` and whose document store,
    /// if any, holds `document`.
    #[must_use]
    pub fn new(snapshot: Snapshot, document: Option<Snapshot>) -> Self {
        let relational = Arc::new(InMemoryStore::from_snapshot(StoreKind::Relational, snapshot));
        let document = document
            .map(|snapshot| Arc::new(InMemoryStore::from_snapshot(StoreKind::Document, snapshot)));

        let state = AppState::new(
            MetricsEngine::new(relational.clone()),
            document
                .clone()
                .map(|store| MetricsEngine::new(store)),
            CartService::new(relational.clone(), CheckoutPricing::default()),
            Duration::from_secs(2),
        );
        let router =
            storelens_server::app(state, SessionManagerLayer::new(MemoryStore::default()));

        Self {
            router,
            cookie: None,
            relational,
            document,
        }
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty());
        self.send(request.expect("valid GET request")).await
    }

    /// Send a urlencoded form POST.
    pub async fn post_form(&mut self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = form
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body));
        self.send(request.expect("valid POST request")).await
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(cookie.to_owned());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse { status, body }
    }
}
