//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use storelens_core::cart::CartService;
use storelens_core::metrics::MetricsEngine;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Stores are held behind the
/// core capability traits, so the router runs unchanged over `PostgreSQL`,
/// `MongoDB` or the in-memory store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    relational: MetricsEngine,
    document: Option<MetricsEngine>,
    carts: CartService,
    query_timeout: Duration,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `relational` - Engine over the relational store, also the default for `/analytics`
    /// * `document` - Engine over the document store, `None` when not configured
    /// * `carts` - Cart service over the relational write path
    /// * `query_timeout` - Upper bound on each side of a comparison
    #[must_use]
    pub fn new(
        relational: MetricsEngine,
        document: Option<MetricsEngine>,
        carts: CartService,
        query_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                relational,
                document,
                carts,
                query_timeout,
            }),
        }
    }

    /// Engine over the relational store.
    #[must_use]
    pub fn relational(&self) -> &MetricsEngine {
        &self.inner.relational
    }

    /// Engine over the document store, if configured.
    #[must_use]
    pub fn document(&self) -> Option<&MetricsEngine> {
        self.inner.document.as_ref()
    }

    /// Cart state machine.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    /// Per-side timeout for dual-store comparisons.
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        self.inner.query_timeout
    }
}
