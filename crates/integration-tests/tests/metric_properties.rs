//! Catalog metrics over hand-built data, evaluated through the engine.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use storelens_core::metrics::{CATALOG, MetricId, MetricOutput, MetricRequest};
use storelens_core::model::Snapshot;
use storelens_core::{CartStatus, OrderStatus, ProductId, StoreKind};
use storelens_integration_tests::{at, basket, cart, engine, order, review, shop, user};

async fn run(snapshot: Snapshot, metric: MetricId) -> MetricOutput {
    let (_, engine) = engine(StoreKind::Relational, snapshot);
    engine.run(&MetricRequest::new(metric)).await.unwrap()
}

#[tokio::test]
async fn test_top_selling_excludes_never_ordered_products() {
    let mut snapshot = shop();
    snapshot.orders = vec![
        basket("o1", "u1", &["p1", "p2"], 1000),
        basket("o2", "u2", &["p1"], 1000),
    ];

    let MetricOutput::TopSelling(rows) = run(snapshot, MetricId::TopSelling).await else {
        panic!("wrong output variant");
    };
    let ids: Vec<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2"]);
    assert_eq!(rows[0].units_sold, 2);
    assert_eq!(rows[0].order_count, 2);
}

#[tokio::test]
async fn test_abandoned_counts_all_items_of_abandoned_carts_only() {
    let mut snapshot = shop();
    snapshot.carts = vec![
        cart("c1", "u1", CartStatus::Abandoned, &[("p1", false), ("p1", true)]),
        cart("c2", "u2", CartStatus::Abandoned, &[("p2", true)]),
        cart("c3", "u3", CartStatus::Active, &[("p3", false)]),
        cart("c4", "u3", CartStatus::Converted, &[("p4", false)]),
    ];

    let MetricOutput::Abandoned(rows) = run(snapshot, MetricId::Abandoned).await else {
        panic!("wrong output variant");
    };
    let counts: Vec<(&str, usize)> = rows
        .iter()
        .map(|r| (r.product_id.as_str(), r.times_abandoned))
        .collect();
    assert_eq!(counts, [("p1", 2), ("p2", 1)]);
}

#[tokio::test]
async fn test_affinity_scenario_and_symmetry() {
    let mut snapshot = shop();
    snapshot.orders = vec![
        basket("o1", "u1", &["p1", "p2"], 1000),
        basket("o2", "u2", &["p1", "p3"], 1000),
        basket("o3", "u3", &["p4"], 1000),
    ];

    let MetricOutput::Affinity(affinity) = run(snapshot, MetricId::Affinity).await else {
        panic!("wrong output variant");
    };
    assert_eq!(affinity.qualifying_orders, 2);
    assert_eq!(affinity.pairs.len(), 2);

    let (p1, p2, p3) = (ProductId::new("p1"), ProductId::new("p2"), ProductId::new("p3"));
    let p1p2 = affinity.pair(&p1, &p2).unwrap();
    assert_eq!(p1p2.orders, 1);
    assert_eq!(p1p2.percentage, Decimal::new(5000, 2));
    assert_eq!(affinity.pair(&p2, &p1), Some(p1p2));
    assert_eq!(affinity.pair(&p1, &p3).unwrap().orders, 1);
    assert!(affinity.pair(&p2, &p3).is_none());
}

#[tokio::test]
async fn test_affinity_counts_repeated_lines_once() {
    let mut snapshot = shop();
    snapshot.orders = vec![order(
        "o1",
        "u1",
        at(2024, 4, 1, 10),
        OrderStatus::Completed,
        &[("p1", 1, 1000), ("p2", 1, 1000), ("p1", 2, 1000)],
    )];

    let MetricOutput::Affinity(affinity) = run(snapshot, MetricId::Affinity).await else {
        panic!("wrong output variant");
    };
    assert_eq!(affinity.pairs.len(), 1);
    assert_eq!(affinity.pairs[0].orders, 1);
    assert_eq!(affinity.pairs[0].percentage, Decimal::new(10000, 2));
}

#[tokio::test]
async fn test_segmentation_boundaries() {
    let mut snapshot = shop();
    snapshot.users = vec![user("regular", "Reg"), user("vip", "Vip")];
    // 4 orders totalling 999.00
    let mut orders: Vec<_> = (0..3)
        .map(|n| basket(&format!("r{n}"), "regular", &["p1"], 25_000))
        .collect();
    orders.push(basket("r3", "regular", &["p1"], 24_900));
    // 5 orders totalling 1000.00
    orders.extend((0..5).map(|n| basket(&format!("v{n}"), "vip", &["p2"], 20_000)));
    snapshot.orders = orders;

    let MetricOutput::Segmentation(behavior) = run(snapshot, MetricId::Segmentation).await else {
        panic!("wrong output variant");
    };
    assert_eq!(behavior.segments.vip, 1);
    assert_eq!(behavior.segments.regular, 1);
    assert_eq!(behavior.segments.casual, 0);
}

#[tokio::test]
async fn test_every_metric_on_empty_store_is_empty_not_an_error() {
    let (_, engine) = engine(StoreKind::Document, Snapshot::default());

    for spec in &CATALOG {
        let output = engine.run(&MetricRequest::new(spec.id)).await.unwrap();
        match output {
            MetricOutput::AbandonmentRate(rate) => {
                assert_eq!(rate.total_carts, 0);
                assert_eq!(rate.rate, Decimal::ZERO);
            }
            MetricOutput::ConversionFunnel(funnel) => assert_eq!(funnel.carts_created, 0),
            MetricOutput::EntityCounts(counts) => {
                assert_eq!(counts.users + counts.products + counts.orders + counts.reviews, 0);
                assert_eq!(counts.carts + counts.cart_items + counts.order_items, 0);
            }
            MetricOutput::Affinity(affinity) => {
                assert_eq!(affinity.qualifying_orders, 0);
                assert!(affinity.pairs.is_empty());
            }
            MetricOutput::Segmentation(behavior) => {
                assert_eq!(behavior.segments.vip + behavior.segments.regular, 0);
            }
            MetricOutput::AvgTimeToPurchase(wait) => {
                assert_eq!(wait.matched_items, 0);
                assert!(wait.average_minutes.is_none());
            }
            MetricOutput::Overview(_) | MetricOutput::PriceSummary(_) => {}
            other => assert_eq!(other.row_count(), 0, "{} should be empty", spec.slug),
        }
    }
}

#[tokio::test]
async fn test_top_rated_averages_reviews() {
    let mut snapshot = shop();
    snapshot.reviews = vec![
        review("r1", "u1", "p1", 5),
        review("r2", "u2", "p1", 4),
        review("r3", "u1", "p2", 2),
    ];

    let MetricOutput::TopRated(rows) = run(snapshot, MetricId::TopRated).await else {
        panic!("wrong output variant");
    };
    assert_eq!(rows[0].product_id.as_str(), "p1");
    assert_eq!(rows[0].average_rating, Decimal::new(450, 2));
}

#[tokio::test]
async fn test_limit_caps_rows() {
    let mut snapshot = shop();
    snapshot.orders = vec![basket("o1", "u1", &["p1", "p2", "p3", "p4"], 1000)];
    let (_, engine) = engine(StoreKind::Relational, snapshot);

    let request = MetricRequest::new(MetricId::TopSelling)
        .with_limit(Some(2))
        .unwrap();
    assert_eq!(engine.run(&request).await.unwrap().row_count(), 2);
    assert!(MetricRequest::new(MetricId::TopSelling).with_limit(Some(101)).is_err());
}
