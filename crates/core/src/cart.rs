//! Cart/order state machine.
//!
//! ```text
//! (no cart) --add--> active --checkout--> converted
//!                      |
//!                      +------abandon---> abandoned
//! ```
//!
//! The caller's cart identifier travels in an explicit [`CartContext`];
//! nothing about the cart lives in process memory. Checkout is delegated to
//! the store so the order, its items and the status flip commit together.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::model::{self, Cart, CartItem, Order, OrderItem, Review};
use crate::store::CartStore;
use crate::types::{
    CartId, CartItemId, CartStatus, OrderId, OrderItemId, OrderStatus, Price, ProductId, Rating,
    ReviewId,
};

/// The caller's handle on its cart. Identifies, never embeds, cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartContext {
    pub cart_id: Option<CartId>,
}

impl CartContext {
    /// Context for a caller with a known cart.
    #[must_use]
    pub const fn with_cart(cart_id: CartId) -> Self {
        Self {
            cart_id: Some(cart_id),
        }
    }
}

/// How checkout prices each current cart line. Every line is quantity 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPricing {
    /// The same unit price for every item.
    Flat(Price),
    /// The product's list price at checkout time.
    Catalog,
}

impl Default for CheckoutPricing {
    fn default() -> Self {
        Self::Flat(Price::from_cents(2000))
    }
}

impl FromStr for CheckoutPricing {
    type Err = Error;

    /// Parses `catalog`, `flat` or `flat:<amount>`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "catalog" => Ok(Self::Catalog),
            "flat" => Ok(Self::default()),
            other => {
                let amount = other
                    .strip_prefix("flat:")
                    .ok_or_else(|| Error::Validation(format!("unknown checkout pricing: {other}")))?;
                let amount = Decimal::from_str(amount)
                    .map_err(|e| Error::Validation(format!("invalid flat price {amount:?}: {e}")))?;
                let price = Price::new(amount).map_err(|e| Error::Validation(e.to_string()))?;
                Ok(Self::Flat(price))
            }
        }
    }
}

/// Result of a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The order was recorded and the cart converted.
    Placed(Order),
    /// The cart is active but has no current items; nothing changed.
    Empty,
    /// The cart already reached a terminal state; nothing changed.
    Closed(CartStatus),
    /// The cart does not exist.
    Missing,
}

impl CheckoutOutcome {
    /// Message shown to the shopper.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Placed(_) => "Purchase completed successfully!",
            Self::Empty | Self::Missing | Self::Closed(_) => "Your cart is empty.",
        }
    }
}

/// Result of an abandon attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonOutcome {
    Abandoned,
    Closed(CartStatus),
    Missing,
}

impl AbandonOutcome {
    /// Message shown to the shopper.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Abandoned => "You abandoned your cart.",
            Self::Closed(_) | Self::Missing => "No active cart to abandon.",
        }
    }
}

/// A current cart line for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
}

/// Build the order a checkout of `cart` would record.
///
/// Returns `None` when the cart has no current items. The order total equals
/// the sum of its item lines by construction.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if catalog pricing is used and a product price
/// is unknown.
pub fn build_order(
    cart: &Cart,
    catalog_prices: &HashMap<ProductId, Price>,
    pricing: &CheckoutPricing,
    at: DateTime<Utc>,
) -> Result<Option<Order>> {
    let order_id = OrderId::generate();
    let mut items = Vec::new();

    for cart_item in cart.current_items() {
        let unit_price = match pricing {
            CheckoutPricing::Flat(price) => *price,
            CheckoutPricing::Catalog => *catalog_prices
                .get(&cart_item.product_id)
                .ok_or_else(|| Error::NotFound(format!("product {}", cart_item.product_id)))?,
        };
        items.push(OrderItem {
            id: OrderItemId::generate(),
            order_id: order_id.clone(),
            product_id: cart_item.product_id.clone(),
            quantity: 1,
            unit_price,
        });
    }

    if items.is_empty() {
        return Ok(None);
    }

    let total_amount = items.iter().map(OrderItem::line_total).sum();
    Ok(Some(Order {
        id: order_id,
        user_id: cart.user_id.clone(),
        order_date: at,
        status: OrderStatus::Completed,
        total_amount,
        items,
    }))
}

/// Cart operations over a [`CartStore`].
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    pricing: CheckoutPricing,
}

impl CartService {
    /// Create a service with the given checkout pricing.
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>, pricing: CheckoutPricing) -> Self {
        Self { store, pricing }
    }

    /// Add a product to the caller's cart, opening a cart if none is active.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the product (or any shopper to own a new cart)
    /// does not exist, [`Error::Validation`] if the product is inactive.
    #[instrument(skip(self), fields(cart_id = ?ctx.cart_id))]
    pub async fn add_item(&self, ctx: &mut CartContext, product_id: &ProductId) -> Result<CartItem> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("product {product_id}")))?;
        if !product.is_active {
            return Err(Error::Validation(format!(
                "product {product_id} is no longer sold"
            )));
        }

        if let Some(cart) = self.active_cart(ctx).await? {
            let item = new_item(&cart.id, product_id);
            if self.store.add_item(&item).await? {
                return Ok(item);
            }
        }

        // No usable cart: open one and add the item to it.
        let shopper = self
            .store
            .pick_shopper()
            .await?
            .ok_or_else(|| Error::NotFound("no shopper to own the cart".to_owned()))?;
        let cart = Cart::open(shopper, model::now());
        self.store.create_cart(&cart).await?;
        info!(cart_id = %cart.id, "opened cart");

        let item = new_item(&cart.id, product_id);
        if !self.store.add_item(&item).await? {
            return Err(Error::NotFound(format!("cart {}", cart.id)));
        }
        ctx.cart_id = Some(cart.id);
        Ok(item)
    }

    /// Logically remove an item from the caller's active cart.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if there is no active cart or the item is not a
    /// current item of it.
    #[instrument(skip(self), fields(cart_id = ?ctx.cart_id))]
    pub async fn remove_item(&self, ctx: &CartContext, item_id: &CartItemId) -> Result<()> {
        let cart = self
            .active_cart(ctx)
            .await?
            .ok_or_else(|| Error::NotFound("active cart".to_owned()))?;
        if self.store.remove_item(&cart.id, item_id, model::now()).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("cart item {item_id}")))
        }
    }

    /// The current (non-removed) lines of the caller's active cart.
    ///
    /// # Errors
    ///
    /// Propagates store failures; no cart yields an empty list.
    pub async fn contents(&self, ctx: &CartContext) -> Result<Vec<CartLine>> {
        let Some(cart) = self.active_cart(ctx).await? else {
            return Ok(Vec::new());
        };

        let mut lines = Vec::new();
        for item in cart.current_items() {
            if let Some(product) = self.store.product(&item.product_id).await? {
                lines.push(CartLine {
                    item_id: item.id.clone(),
                    product_id: product.id,
                    name: product.name,
                    price: product.price,
                });
            }
        }
        Ok(lines)
    }

    /// Check out the caller's cart.
    ///
    /// The context forgets the cart once it is converted (or turns out to be
    /// closed or missing); an empty active cart is kept.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[instrument(skip(self), fields(cart_id = ?ctx.cart_id))]
    pub async fn checkout(&self, ctx: &mut CartContext) -> Result<CheckoutOutcome> {
        let Some(cart_id) = ctx.cart_id.clone() else {
            return Ok(CheckoutOutcome::Empty);
        };

        let outcome = self.store.checkout(&cart_id, &self.pricing, model::now()).await?;
        match &outcome {
            CheckoutOutcome::Placed(order) => {
                info!(order_id = %order.id, total = %order.total_amount, "checkout completed");
                ctx.cart_id = None;
            }
            CheckoutOutcome::Closed(_) | CheckoutOutcome::Missing => ctx.cart_id = None,
            CheckoutOutcome::Empty => {}
        }
        Ok(outcome)
    }

    /// Abandon the caller's cart.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[instrument(skip(self), fields(cart_id = ?ctx.cart_id))]
    pub async fn abandon(&self, ctx: &mut CartContext) -> Result<AbandonOutcome> {
        let Some(cart_id) = ctx.cart_id.take() else {
            return Ok(AbandonOutcome::Missing);
        };
        let outcome = self.store.abandon(&cart_id).await?;
        if outcome == AbandonOutcome::Abandoned {
            info!(%cart_id, "cart abandoned");
        }
        Ok(outcome)
    }

    /// Record a rating for a product.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the product does not exist or there is no
    /// shopper to attribute the review to.
    #[instrument(skip(self, comment))]
    pub async fn rate(
        &self,
        product_id: &ProductId,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<Review> {
        if self.store.product(product_id).await?.is_none() {
            return Err(Error::NotFound(format!("product {product_id}")));
        }
        let user_id = self
            .store
            .pick_shopper()
            .await?
            .ok_or_else(|| Error::NotFound("no shopper to attribute the review to".to_owned()))?;

        let review = Review {
            id: ReviewId::generate(),
            user_id,
            product_id: product_id.clone(),
            rating,
            comment: comment.or_else(|| Some("Rated from frontend".to_owned())),
            review_date: model::now(),
        };
        self.store.add_review(&review).await?;
        Ok(review)
    }

    async fn active_cart(&self, ctx: &CartContext) -> Result<Option<Cart>> {
        let Some(cart_id) = &ctx.cart_id else {
            return Ok(None);
        };
        Ok(self
            .store
            .cart(cart_id)
            .await?
            .filter(|cart| cart.status == CartStatus::Active))
    }
}

fn new_item(cart_id: &CartId, product_id: &ProductId) -> CartItem {
    CartItem {
        id: CartItemId::generate(),
        cart_id: cart_id.clone(),
        product_id: product_id.clone(),
        added_at: model::now(),
        removed_at: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::StoreKind;
    use crate::model::{Product, Snapshot};
    use crate::store::{InMemoryStore, MetricsStore};
    use crate::testing::{product, user};

    fn service(pricing: CheckoutPricing) -> (Arc<InMemoryStore>, CartService) {
        let snapshot = Snapshot {
            users: vec![user("u1", "Ada")],
            products: vec![
                product("p1", "Lamp", 1500),
                product("p2", "Rug", 8000),
                Product {
                    is_active: false,
                    ..product("p3", "Retired", 100)
                },
            ],
            ..Snapshot::default()
        };
        let store = Arc::new(InMemoryStore::from_snapshot(StoreKind::Relational, snapshot));
        let service = CartService::new(store.clone(), pricing);
        (store, service)
    }

    #[tokio::test]
    async fn test_first_add_opens_active_cart() {
        let (store, service) = service(CheckoutPricing::default());
        let mut ctx = CartContext::default();

        service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        let cart_id = ctx.cart_id.clone().unwrap();

        service.add_item(&mut ctx, &ProductId::new("p2")).await.unwrap();
        assert_eq!(ctx.cart_id.as_ref(), Some(&cart_id), "second add reuses cart");

        let carts = store.carts().await.unwrap();
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].status, CartStatus::Active);
        assert_eq!(carts[0].items.len(), 2);
    }

    #[tokio::test]
    async fn test_add_unknown_or_inactive_product_is_rejected() {
        let (store, service) = service(CheckoutPricing::default());
        let mut ctx = CartContext::default();

        let err = service.add_item(&mut ctx, &ProductId::new("nope")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let err = service.add_item(&mut ctx, &ProductId::new("p3")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert!(ctx.cart_id.is_none());
        assert!(store.carts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removed_items_are_hidden_but_kept() {
        let (store, service) = service(CheckoutPricing::default());
        let mut ctx = CartContext::default();

        let lamp = service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        service.add_item(&mut ctx, &ProductId::new("p2")).await.unwrap();
        service.remove_item(&ctx, &lamp.id).await.unwrap();

        let lines = service.contents(&ctx).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Rug");

        let carts = store.carts().await.unwrap();
        assert_eq!(carts[0].items.len(), 2, "removal is logical");

        let again = service.remove_item(&ctx, &lamp.id).await.unwrap_err();
        assert!(matches!(again, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_checkout_total_matches_items_and_is_not_repeated() {
        let (store, service) = service(CheckoutPricing::default());
        let mut ctx = CartContext::default();
        service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        service.add_item(&mut ctx, &ProductId::new("p2")).await.unwrap();
        let cart_id = ctx.cart_id.clone().unwrap();

        let CheckoutOutcome::Placed(order) = service.checkout(&mut ctx).await.unwrap() else {
            panic!("expected an order");
        };
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_amount, Decimal::new(4000, 2));
        assert_eq!(order.total_amount, order.items_total());
        assert!(ctx.cart_id.is_none());

        // A second submit with the stale cart id must not create another order.
        let mut stale = CartContext::with_cart(cart_id);
        let second = service.checkout(&mut stale).await.unwrap();
        assert_eq!(second, CheckoutOutcome::Closed(CartStatus::Converted));
        assert_eq!(store.orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_pricing_uses_list_prices() {
        let (_, service) = service(CheckoutPricing::Catalog);
        let mut ctx = CartContext::default();
        service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        service.add_item(&mut ctx, &ProductId::new("p2")).await.unwrap();

        let CheckoutOutcome::Placed(order) = service.checkout(&mut ctx).await.unwrap() else {
            panic!("expected an order");
        };
        assert_eq!(order.total_amount, Decimal::new(9500, 2));
    }

    #[tokio::test]
    async fn test_checkout_without_items_reports_empty() {
        let (store, service) = service(CheckoutPricing::default());

        let mut none = CartContext::default();
        assert_eq!(service.checkout(&mut none).await.unwrap(), CheckoutOutcome::Empty);

        let mut ctx = CartContext::default();
        let item = service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        service.remove_item(&ctx, &item.id).await.unwrap();
        assert_eq!(service.checkout(&mut ctx).await.unwrap(), CheckoutOutcome::Empty);
        assert!(ctx.cart_id.is_some(), "empty active cart is kept");
        assert!(store.orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandon_only_from_active() {
        let (store, service) = service(CheckoutPricing::default());
        let mut ctx = CartContext::default();
        service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        let cart_id = ctx.cart_id.clone().unwrap();

        service.checkout(&mut ctx).await.unwrap();
        let mut stale = CartContext::with_cart(cart_id);
        let outcome = service.abandon(&mut stale).await.unwrap();
        assert_eq!(outcome, AbandonOutcome::Closed(CartStatus::Converted));
        assert_eq!(store.carts().await.unwrap()[0].status, CartStatus::Converted);

        let mut fresh = CartContext::default();
        service.add_item(&mut fresh, &ProductId::new("p2")).await.unwrap();
        assert_eq!(service.abandon(&mut fresh).await.unwrap(), AbandonOutcome::Abandoned);
        assert_eq!(service.abandon(&mut fresh).await.unwrap(), AbandonOutcome::Missing);
    }

    #[tokio::test]
    async fn test_adding_after_abandon_opens_a_new_cart() {
        let (store, service) = service(CheckoutPricing::default());
        let mut ctx = CartContext::default();
        service.add_item(&mut ctx, &ProductId::new("p1")).await.unwrap();
        let first = ctx.cart_id.clone().unwrap();
        store.abandon(&first).await.unwrap();

        service.add_item(&mut ctx, &ProductId::new("p2")).await.unwrap();
        assert_ne!(ctx.cart_id.as_ref(), Some(&first));
        assert_eq!(store.carts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rating_requires_existing_product() {
        let (store, service) = service(CheckoutPricing::default());
        let rating = Rating::new(4).unwrap();

        let err = service.rate(&ProductId::new("ghost"), rating, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let review = service.rate(&ProductId::new("p1"), rating, None).await.unwrap();
        assert_eq!(review.user_id.as_str(), "u1");
        assert_eq!(store.reviews().await.unwrap().len(), 1);
    }

    #[test]
    fn test_pricing_parses_config_values() {
        assert_eq!("catalog".parse::<CheckoutPricing>().unwrap(), CheckoutPricing::Catalog);
        assert_eq!("flat".parse::<CheckoutPricing>().unwrap(), CheckoutPricing::default());
        assert_eq!(
            "flat:12.50".parse::<CheckoutPricing>().unwrap(),
            CheckoutPricing::Flat(Price::from_cents(1250))
        );
        assert!("flat:-1".parse::<CheckoutPricing>().is_err());
        assert!("free".parse::<CheckoutPricing>().is_err());
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(CheckoutOutcome::Empty.message(), "Your cart is empty.");
        assert_eq!(AbandonOutcome::Missing.message(), "No active cart to abandon.");
    }
}
