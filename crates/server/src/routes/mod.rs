//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Relational store reachable
//!
//! # Products
//! GET  /products?sort=              - Active products (newest, price_low, price_high)
//! POST /products/{id}/rate          - Record a rating (form: rating, comment)
//!
//! # Cart (session-scoped)
//! GET  /cart                        - Current items
//! POST /cart/add                    - Add item (form: product_id)
//! POST /cart/remove                 - Soft-remove item (form: cart_item_id)
//! POST /cart/checkout               - Convert cart into an order
//! POST /cart/abandon                - Abandon cart
//!
//! # Analytics
//! GET  /analytics                   - Metric catalog
//! GET  /analytics/comparison        - One metric against both stores (metric, limit)
//! GET  /analytics/{slug}            - One metric against one store (limit, store, sort)
//! ```

pub mod analytics;
pub mod cart;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}/rate", post(products::rate))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
        .route("/abandon", post(cart::abandon))
}

/// Create the analytics routes router.
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(analytics::index))
        // Static segment wins over the slug capture
        .route("/comparison", get(analytics::comparison))
        .route("/{slug}", get(analytics::show))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/analytics", analytics_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the relational store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.relational().store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
