//! In-memory store.
//!
//! Holds a [`Snapshot`] behind a lock and implements both store interfaces.
//! Used by tests and by the comparison when exercising either side without
//! a live database. It can be switched offline to simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::seq::IndexedRandom;

use super::{CartStore, MetricsStore};
use crate::cart::{AbandonOutcome, CheckoutOutcome, CheckoutPricing, build_order};
use crate::error::{Error, Result, StoreKind};
use crate::model::{Cart, CartItem, Order, Product, Review, Snapshot, User};
use crate::types::{CartId, CartItemId, CartStatus, Price, ProductId, UserId};

/// Store backed by process memory.
pub struct InMemoryStore {
    kind: StoreKind,
    data: RwLock<Snapshot>,
    offline: AtomicBool,
}

impl InMemoryStore {
    /// An empty store reporting itself as `kind`.
    #[must_use]
    pub fn new(kind: StoreKind) -> Self {
        Self::from_snapshot(kind, Snapshot::default())
    }

    /// A store preloaded with `snapshot`.
    #[must_use]
    pub fn from_snapshot(kind: StoreKind, snapshot: Snapshot) -> Self {
        Self {
            kind,
            data: RwLock::new(snapshot),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with [`Error::DataUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.data.read().clone()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::unavailable(self.kind, "store is offline"))
        } else {
            Ok(())
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> Result<T> {
        self.check_online()?;
        Ok(f(&self.data.read()))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Snapshot) -> T) -> Result<T> {
        self.check_online()?;
        Ok(f(&mut self.data.write()))
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("kind", &self.kind)
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetricsStore for InMemoryStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.read(|d| d.users.clone())
    }

    async fn products(&self) -> Result<Vec<Product>> {
        self.read(|d| d.products.clone())
    }

    async fn carts(&self) -> Result<Vec<Cart>> {
        self.read(|d| d.carts.clone())
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        self.read(|d| d.orders.clone())
    }

    async fn reviews(&self) -> Result<Vec<Review>> {
        self.read(|d| d.reviews.clone())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn product(&self, id: &ProductId) -> Result<Option<Product>> {
        self.read(|d| d.products.iter().find(|p| &p.id == id).cloned())
    }

    async fn pick_shopper(&self) -> Result<Option<UserId>> {
        self.read(|d| d.users.choose(&mut rand::rng()).map(|u| u.id.clone()))
    }

    async fn cart(&self, id: &CartId) -> Result<Option<Cart>> {
        self.read(|d| d.carts.iter().find(|c| &c.id == id).cloned())
    }

    async fn create_cart(&self, cart: &Cart) -> Result<()> {
        self.write(|d| d.carts.push(cart.clone()))
    }

    async fn add_item(&self, item: &CartItem) -> Result<bool> {
        self.write(|d| {
            match d
                .carts
                .iter_mut()
                .find(|c| c.id == item.cart_id && c.status == CartStatus::Active)
            {
                Some(cart) => {
                    cart.items.push(item.clone());
                    true
                }
                None => false,
            }
        })
    }

    async fn remove_item(
        &self,
        cart_id: &CartId,
        item_id: &CartItemId,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.write(|d| {
            let item = d
                .carts
                .iter_mut()
                .filter(|c| &c.id == cart_id)
                .flat_map(|c| c.items.iter_mut())
                .find(|i| &i.id == item_id && i.is_current());
            item.map(|i| i.removed_at = Some(at)).is_some()
        })
    }

    async fn checkout(
        &self,
        cart_id: &CartId,
        pricing: &CheckoutPricing,
        at: DateTime<Utc>,
    ) -> Result<CheckoutOutcome> {
        self.check_online()?;
        // One write guard covers the status check, the order insert and the flip.
        let mut guard = self.data.write();
        let data = &mut *guard;
        let prices: HashMap<ProductId, Price> = data
            .products
            .iter()
            .map(|p| (p.id.clone(), p.price))
            .collect();

        let Some(cart) = data.carts.iter_mut().find(|c| &c.id == cart_id) else {
            return Ok(CheckoutOutcome::Missing);
        };
        if cart.status != CartStatus::Active {
            return Ok(CheckoutOutcome::Closed(cart.status));
        }

        let Some(order) = build_order(cart, &prices, pricing, at)? else {
            return Ok(CheckoutOutcome::Empty);
        };
        cart.status = CartStatus::Converted;
        data.orders.push(order.clone());
        Ok(CheckoutOutcome::Placed(order))
    }

    async fn abandon(&self, cart_id: &CartId) -> Result<AbandonOutcome> {
        self.write(|d| match d.carts.iter_mut().find(|c| &c.id == cart_id) {
            None => AbandonOutcome::Missing,
            Some(cart) if cart.status.can_transition_to(CartStatus::Abandoned) => {
                cart.status = CartStatus::Abandoned;
                AbandonOutcome::Abandoned
            }
            Some(cart) => AbandonOutcome::Closed(cart.status),
        })
    }

    async fn add_review(&self, review: &Review) -> Result<()> {
        self.write(|d| d.reviews.push(review.clone()))
    }
}
