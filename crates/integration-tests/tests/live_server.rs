//! HTTP tests against a running server.
//!
//! These tests require:
//! - `PostgreSQL` migrated and seeded (`storelens migrate && storelens seed --mirror`)
//! - The server running (`cargo run -p storelens-server`)
//!
//! Run with: `cargo test -p storelens-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Base URL for the server (configurable via environment).
fn base_url() -> String {
    std::env::var("STORELENS_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:5001".to_string())
}

/// A client that keeps the session cookie between requests.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "requires running server"]
async fn test_readiness() {
    let resp = client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires running server with seeded data"]
async fn test_every_metric_answers() {
    let client = client();
    let catalog: Value = client
        .get(format!("{}/analytics", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for spec in catalog.as_array().unwrap() {
        let slug = spec["slug"].as_str().unwrap();
        let resp = client
            .get(format!("{}/analytics/{slug}", base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "metric {slug}");
    }
}

#[tokio::test]
#[ignore = "requires running server with seeded and mirrored data"]
async fn test_comparison_reports_both_stores() {
    let body: Value = client()
        .get(format!("{}/analytics/comparison?metric=entity-counts", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["relational"]["ok"], true);
    assert_eq!(body["document"]["ok"], true);
}

#[tokio::test]
#[ignore = "requires running server with seeded data"]
async fn test_cart_round_trip() {
    let client = client();
    let base = base_url();

    let products: Value = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product_id = products[0]["id"].as_str().unwrap().to_owned();

    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", product_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let lines: Value = client
        .get(format!("{base}/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(lines.as_array().unwrap().len(), 1);

    let order: Value = client
        .post(format!("{base}/cart/checkout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(order["order_id"].is_string());
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
}
