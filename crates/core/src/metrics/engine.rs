//! Metric evaluation against a store, and the dual-store comparison.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{MetricId, MetricOutput, MetricRequest, compute};
use crate::error::{Error, Result, StoreKind};
use crate::store::{Datasets, MetricsStore};

/// Evaluates catalog metrics against one store.
#[derive(Clone)]
pub struct MetricsEngine {
    store: Arc<dyn MetricsStore>,
}

impl MetricsEngine {
    #[must_use]
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    /// Which store this engine reads.
    #[must_use]
    pub fn kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MetricsStore> {
        &self.store
    }

    /// Load the metric's declared inputs and compute it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataUnavailable`] if the store cannot be read.
    #[instrument(skip(self), fields(store = %self.kind(), metric = %request.metric))]
    pub async fn run(&self, request: &MetricRequest) -> Result<MetricOutput> {
        let spec = request.metric.spec();
        let data = Datasets::load(self.store.as_ref(), spec.inputs).await?;
        let output = compute(request, &data);
        debug!(rows = output.row_count(), "metric computed");
        Ok(output)
    }
}

impl std::fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("store", &self.kind())
            .finish()
    }
}

/// One store's side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideReport {
    pub store: StoreKind,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MetricOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SideReport {
    fn new(store: StoreKind, result: Result<MetricOutput>, elapsed: Duration) -> Self {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(output) => Self {
                store,
                ok: true,
                result: Some(output),
                error: None,
                elapsed_ms,
            },
            Err(err) => Self {
                store,
                ok: false,
                result: None,
                error: Some(err.to_string()),
                elapsed_ms,
            },
        }
    }
}

/// The same metric evaluated independently against both stores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub metric: MetricId,
    pub relational: SideReport,
    pub document: SideReport,
}

impl Comparison {
    /// Whether both sides succeeded with identical payloads.
    #[must_use]
    pub fn agree(&self) -> bool {
        self.relational.ok && self.document.ok && self.relational.result == self.document.result
    }
}

/// Run `request` against both stores concurrently.
///
/// A missing engine, an error or a timeout on one side is reported in that
/// side's [`SideReport`] and never affects the other side.
pub async fn compare(
    relational: Option<&MetricsEngine>,
    document: Option<&MetricsEngine>,
    request: &MetricRequest,
    timeout: Duration,
) -> Comparison {
    let (relational, document) = futures::join!(
        run_side(StoreKind::Relational, relational, request, timeout),
        run_side(StoreKind::Document, document, request, timeout),
    );
    Comparison {
        metric: request.metric,
        relational,
        document,
    }
}

async fn run_side(
    kind: StoreKind,
    engine: Option<&MetricsEngine>,
    request: &MetricRequest,
    timeout: Duration,
) -> SideReport {
    let started = Instant::now();
    let result = match engine {
        None => Err(Error::unavailable(kind, "not configured")),
        Some(engine) => tokio::time::timeout(timeout, engine.run(request))
            .await
            .unwrap_or_else(|_| {
                Err(Error::unavailable(
                    kind,
                    format!("no answer within {}s", timeout.as_secs_f32()),
                ))
            }),
    };

    if let Err(err) = &result {
        warn!(store = %kind, metric = %request.metric, error = %err, "comparison side failed");
    }
    SideReport::new(kind, result, started.elapsed())
}
