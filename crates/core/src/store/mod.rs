//! Store capability interfaces.
//!
//! The metrics engine is written once against [`MetricsStore`]; each backing
//! store supplies an adapter that translates the dataset reads into its
//! native query language. The write path of the cart state machine goes
//! through [`CartStore`], which must apply checkout atomically.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cart::{AbandonOutcome, CheckoutOutcome, CheckoutPricing};
use crate::error::{Result, StoreKind};
use crate::model::{Cart, CartItem, Order, Product, Review, User};
use crate::types::{CartId, CartItemId, ProductId, UserId};

pub use memory::InMemoryStore;

/// Read capability needed by the metric catalog.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Which store this adapter fronts.
    fn kind(&self) -> StoreKind;

    /// Round-trip to the store without reading data.
    async fn ping(&self) -> Result<()>;

    /// All users.
    async fn users(&self) -> Result<Vec<User>>;

    /// All products, inactive included.
    async fn products(&self) -> Result<Vec<Product>>;

    /// All carts with every item, removed ones included.
    async fn carts(&self) -> Result<Vec<Cart>>;

    /// All orders with their items.
    async fn orders(&self) -> Result<Vec<Order>>;

    /// All reviews.
    async fn reviews(&self) -> Result<Vec<Review>>;
}

/// Write capability driving the cart/order state machine.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Look up a product by id.
    async fn product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Pick the shopper a new cart or review is attributed to.
    async fn pick_shopper(&self) -> Result<Option<UserId>>;

    /// Load a cart with all its items.
    async fn cart(&self, id: &CartId) -> Result<Option<Cart>>;

    /// Persist a newly opened cart.
    async fn create_cart(&self, cart: &Cart) -> Result<()>;

    /// Append an item to a cart. Returns `false` if the cart is not active.
    async fn add_item(&self, item: &CartItem) -> Result<bool>;

    /// Set `removed_at` on a current item. Returns `false` if no current item matched.
    async fn remove_item(
        &self,
        cart_id: &CartId,
        item_id: &CartItemId,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Convert an active cart into an order in one atomic step.
    async fn checkout(
        &self,
        cart_id: &CartId,
        pricing: &CheckoutPricing,
        at: DateTime<Utc>,
    ) -> Result<CheckoutOutcome>;

    /// Move an active cart to `abandoned`.
    async fn abandon(&self, cart_id: &CartId) -> Result<AbandonOutcome>;

    /// Record a review.
    async fn add_review(&self, review: &Review) -> Result<()>;
}

/// A dataset a metric declares as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Users,
    Products,
    Carts,
    Orders,
    Reviews,
}

/// The datasets loaded for one metric evaluation. Undeclared inputs stay empty.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub users: Vec<User>,
    pub products: Vec<Product>,
    pub carts: Vec<Cart>,
    pub orders: Vec<Order>,
    pub reviews: Vec<Review>,
}

impl Datasets {
    /// Load the requested datasets concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first store error; the remaining loads are dropped.
    pub async fn load(store: &dyn MetricsStore, inputs: &[Dataset]) -> Result<Self> {
        let wants = |dataset: Dataset| inputs.contains(&dataset);

        let (users, products, carts, orders, reviews) = futures::try_join!(
            load_if(wants(Dataset::Users), store.users()),
            load_if(wants(Dataset::Products), store.products()),
            load_if(wants(Dataset::Carts), store.carts()),
            load_if(wants(Dataset::Orders), store.orders()),
            load_if(wants(Dataset::Reviews), store.reviews()),
        )?;

        Ok(Self {
            users,
            products,
            carts,
            orders,
            reviews,
        })
    }
}

impl From<crate::model::Snapshot> for Datasets {
    fn from(snapshot: crate::model::Snapshot) -> Self {
        Self {
            users: snapshot.users,
            products: snapshot.products,
            carts: snapshot.carts,
            orders: snapshot.orders,
            reviews: snapshot.reviews,
        }
    }
}

async fn load_if<T>(
    wanted: bool,
    load: impl std::future::Future<Output = Result<Vec<T>>>,
) -> Result<Vec<T>> {
    if wanted { load.await } else { Ok(Vec::new()) }
}
