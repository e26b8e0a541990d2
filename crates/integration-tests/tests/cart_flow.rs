//! Cart state machine through the service and through the HTTP router.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use storelens_core::cart::{AbandonOutcome, CartContext, CartService, CheckoutOutcome, CheckoutPricing};
use storelens_core::store::InMemoryStore;
use storelens_core::{CartId, CartStatus, Error, ProductId, StoreKind};
use storelens_integration_tests::{TestApp, shop};

fn service(pricing: CheckoutPricing) -> (Arc<InMemoryStore>, CartService) {
    let store = Arc::new(InMemoryStore::from_snapshot(StoreKind::Relational, shop()));
    let service = CartService::new(store.clone(), pricing);
    (store, service)
}

#[tokio::test]
async fn test_checkout_is_idempotent_and_total_matches_items() {
    let (store, carts) = service(CheckoutPricing::Catalog);
    let mut ctx = CartContext::default();

    carts.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
    carts.add_item(&mut ctx, &ProductId::new("p2")).await.unwrap();
    let cart_id = ctx.cart_id.clone().unwrap();

    let CheckoutOutcome::Placed(order) = carts.checkout(&mut ctx).await.unwrap() else {
        panic!("first checkout should place an order");
    };
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.total_amount, order.items_total());
    assert_eq!(order.total_amount, Decimal::new(9500, 2));
    assert!(ctx.cart_id.is_none());

    // Replaying the checkout against the converted cart changes nothing
    let mut replay = CartContext::with_cart(cart_id.clone());
    let outcome = carts.checkout(&mut replay).await.unwrap();
    assert_eq!(outcome, CheckoutOutcome::Closed(CartStatus::Converted));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.orders.len(), 1);
    let cart = snapshot.carts.iter().find(|c| c.id == cart_id).unwrap();
    assert_eq!(cart.status, CartStatus::Converted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_checkouts_place_one_order() {
    let (store, carts) = service(CheckoutPricing::default());
    let mut ctx = CartContext::default();
    carts.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
    carts.add_item(&mut ctx, &ProductId::new("p4")).await.unwrap();
    let cart_id = ctx.cart_id.clone().unwrap();

    let checkout = |carts: CartService, cart_id: CartId| {
        tokio::spawn(async move {
            let mut ctx = CartContext::with_cart(cart_id);
            carts.checkout(&mut ctx).await.unwrap()
        })
    };
    let first = checkout(carts.clone(), cart_id.clone());
    let second = checkout(carts.clone(), cart_id.clone());
    let (first, second) = tokio::join!(first, second);
    let outcomes = [first.unwrap(), second.unwrap()];

    let placed = outcomes
        .iter()
        .filter(|o| matches!(o, CheckoutOutcome::Placed(_)))
        .count();
    assert_eq!(placed, 1);
    assert!(outcomes.contains(&CheckoutOutcome::Closed(CartStatus::Converted)));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.orders.len(), 1);
    assert_eq!(snapshot.orders[0].items.len(), 2);
}

#[tokio::test]
async fn test_removed_items_are_not_bought() {
    let (store, carts) = service(CheckoutPricing::default());
    let mut ctx = CartContext::default();

    let kept = carts.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
    let dropped = carts.add_item(&mut ctx, &ProductId::new("p3")).await.unwrap();
    carts.remove_item(&ctx, &dropped.id).await.unwrap();

    let lines = carts.contents(&ctx).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].item_id, kept.id);

    // A removed item cannot be removed twice
    assert!(matches!(
        carts.remove_item(&ctx, &dropped.id).await,
        Err(Error::NotFound(_))
    ));

    let CheckoutOutcome::Placed(order) = carts.checkout(&mut ctx).await.unwrap() else {
        panic!("checkout should place an order");
    };
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.total_amount, Decimal::new(2000, 2));

    // The removed row is kept with its removal time
    let cart = &store.snapshot().carts[0];
    assert_eq!(cart.items.len(), 2);
    assert!(cart.items.iter().any(|i| i.removed_at.is_some()));
}

#[tokio::test]
async fn test_abandon_only_from_active() {
    let (store, carts) = service(CheckoutPricing::default());
    let mut ctx = CartContext::default();
    carts.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
    let cart_id = ctx.cart_id.clone().unwrap();

    carts.checkout(&mut ctx).await.unwrap();

    let mut late = CartContext::with_cart(cart_id.clone());
    let outcome = carts.abandon(&mut late).await.unwrap();
    assert_eq!(outcome, AbandonOutcome::Closed(CartStatus::Converted));
    assert!(late.cart_id.is_none());

    let cart = store
        .snapshot()
        .carts
        .into_iter()
        .find(|c| c.id == cart_id)
        .unwrap();
    assert_eq!(cart.status, CartStatus::Converted);
}

#[tokio::test]
async fn test_adding_after_abandon_opens_new_cart() {
    let (store, carts) = service(CheckoutPricing::default());
    let mut ctx = CartContext::default();
    carts.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
    let first = ctx.cart_id.clone().unwrap();

    assert_eq!(carts.abandon(&mut ctx).await.unwrap(), AbandonOutcome::Abandoned);

    // A stale context pointing at the abandoned cart
    let mut stale = CartContext::with_cart(first.clone());
    carts.add_item(&mut stale, &ProductId::new("p2")).await.unwrap();
    let second = stale.cart_id.clone().unwrap();
    assert_ne!(first, second);

    let snapshot = store.snapshot();
    let abandoned = snapshot.carts.iter().find(|c| c.id == first).unwrap();
    assert_eq!(abandoned.status, CartStatus::Abandoned);
    assert_eq!(abandoned.items.len(), 1);
}

#[tokio::test]
async fn test_inactive_product_rejected() {
    let mut snapshot = shop();
    snapshot.products[0].is_active = false;
    let store = Arc::new(InMemoryStore::from_snapshot(StoreKind::Relational, snapshot));
    let carts = CartService::new(store, CheckoutPricing::default());

    let mut ctx = CartContext::default();
    let err = carts.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(ctx.cart_id.is_none());
}

#[tokio::test]
async fn test_session_cart_flow_over_http() {
    let mut app = TestApp::new(shop(), None);

    let added = app.post_form("/cart/add", &[("product_id", "p1")]).await;
    assert_eq!(added.status, StatusCode::OK);
    let cart_id = added.body["cart_id"].as_str().unwrap().to_owned();

    let added = app.post_form("/cart/add", &[("product_id", "p2")]).await;
    assert_eq!(added.body["cart_id"], cart_id.as_str());
    let second_item = added.body["cart_item_id"].as_str().unwrap().to_owned();

    let removed = app
        .post_form("/cart/remove", &[("cart_item_id", &second_item)])
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let current = app.get("/cart").await;
    let lines = current.body.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product_id"], "p1");

    let checkout = app.post_form("/cart/checkout", &[]).await;
    assert_eq!(checkout.status, StatusCode::OK);
    assert_eq!(checkout.body["total_amount"], "20.00");
    assert_eq!(checkout.body["message"], "Purchase completed successfully!");

    // The session no longer points at a cart
    let current = app.get("/cart").await;
    assert!(current.body.as_array().unwrap().is_empty());
    let again = app.post_form("/cart/checkout", &[]).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["message"], "Your cart is empty.");

    assert_eq!(app.relational.snapshot().orders.len(), 1);
}

#[tokio::test]
async fn test_abandon_over_http() {
    let mut app = TestApp::new(shop(), None);

    let nothing = app.post_form("/cart/abandon", &[]).await;
    assert_eq!(nothing.status, StatusCode::OK);
    assert_eq!(nothing.body["message"], "No active cart to abandon.");

    app.post_form("/cart/add", &[("product_id", "p3")]).await;
    let abandoned = app.post_form("/cart/abandon", &[]).await;
    assert_eq!(abandoned.body["message"], "You abandoned your cart.");

    let carts = app.relational.snapshot().carts;
    assert_eq!(carts.len(), 1);
    assert_eq!(carts[0].status, CartStatus::Abandoned);
}

#[tokio::test]
async fn test_rating_over_http() {
    let mut app = TestApp::new(shop(), None);

    let bad = app.post_form("/products/p1/rate", &[("rating", "0")]).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let missing = app.post_form("/products/p9/rate", &[("rating", "3")]).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let ok = app.post_form("/products/p1/rate", &[("rating", "5")]).await;
    assert_eq!(ok.status, StatusCode::OK);

    let reviews = app.relational.snapshot().reviews;
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating.value(), 5);
    assert_eq!(reviews[0].comment.as_deref(), Some("Rated from frontend"));
}
