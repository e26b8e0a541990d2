//! Dual-store comparison with healthy, failing and missing document stores.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use axum::http::StatusCode;
use storelens_core::StoreKind;
use storelens_core::metrics::{self, MetricId, MetricRequest};
use storelens_core::model::Snapshot;
use storelens_integration_tests::{TestApp, basket, engine, review, shop};

fn populated() -> Snapshot {
    let mut snapshot = shop();
    snapshot.orders = vec![
        basket("o1", "u1", &["p1", "p2"], 1500),
        basket("o2", "u2", &["p1", "p3"], 2500),
        basket("o3", "u1", &["p4"], 4000),
    ];
    snapshot.reviews = vec![review("r1", "u1", "p1", 4), review("r2", "u2", "p3", 2)];
    snapshot
}

#[tokio::test]
async fn test_mirrored_stores_agree_on_every_metric() {
    let (_, relational) = engine(StoreKind::Relational, populated());
    let (_, document) = engine(StoreKind::Document, populated());

    for metric in [
        MetricId::TopSelling,
        MetricId::Affinity,
        MetricId::CustomerSpending,
        MetricId::TopRated,
        MetricId::EntityCounts,
    ] {
        let comparison = metrics::compare(
            Some(&relational),
            Some(&document),
            &MetricRequest::new(metric),
            Duration::from_secs(1),
        )
        .await;
        assert!(comparison.agree(), "{metric} differs between stores");
    }
}

#[tokio::test]
async fn test_document_down_still_reports_relational_over_http() {
    let mut app = TestApp::new(populated(), Some(populated()));
    app.document.as_ref().unwrap().set_offline(true);

    let response = app
        .get("/analytics/comparison?metric=top-selling&limit=2")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = &response.body;
    assert_eq!(body["metric"], "top-selling");
    assert_eq!(body["relational"]["ok"], true);
    assert_eq!(body["relational"]["result"]["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["document"]["ok"], false);
    assert!(body["document"].get("result").is_none());
    assert!(
        body["document"]["error"]
            .as_str()
            .unwrap()
            .starts_with("document store unavailable")
    );
}

#[tokio::test]
async fn test_relational_down_still_reports_document_over_http() {
    let mut app = TestApp::new(populated(), Some(populated()));
    app.relational.set_offline(true);

    let response = app.get("/analytics/comparison").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["relational"]["ok"], false);
    assert_eq!(response.body["document"]["ok"], true);

    let single = app.get("/analytics/top-selling").await;
    assert_eq!(single.status, StatusCode::SERVICE_UNAVAILABLE);

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unconfigured_document_store_reported_in_payload() {
    let mut app = TestApp::new(populated(), None);

    let response = app.get("/analytics/comparison?metric=affinity").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["relational"]["ok"], true);
    assert!(
        response.body["document"]["error"]
            .as_str()
            .unwrap()
            .contains("not configured")
    );
}

#[tokio::test]
async fn test_document_store_served_by_store_parameter() {
    let mut document = populated();
    document.orders.truncate(1);
    let mut app = TestApp::new(populated(), Some(document));

    let relational = app.get("/analytics/entity-counts").await;
    let from_document = app.get("/analytics/entity-counts?store=mongodb").await;
    assert_eq!(relational.status, StatusCode::OK);
    assert_eq!(from_document.status, StatusCode::OK);
    assert_eq!(relational.body["data"]["orders"], 3);
    assert_eq!(from_document.body["store"], "document");
    assert_eq!(from_document.body["data"]["orders"], 1);
}

#[tokio::test]
async fn test_comparison_rejects_unknown_metric() {
    let mut app = TestApp::new(populated(), None);

    let response = app.get("/analytics/comparison?metric=nonsense").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
