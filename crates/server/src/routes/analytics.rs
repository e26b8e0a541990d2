//! Analytics route handlers.
//!
//! Every metric of the catalog is served by one handler; the slug picks the
//! metric and `store` picks the backing store. `/analytics/comparison` runs
//! one metric against both stores and always answers 200, reporting a failed
//! side inside the payload.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storelens_core::metrics::{
    self, CATALOG, Comparison, MetricId, MetricOutput, MetricRequest, MetricSpec,
};
use storelens_core::{Error as CoreError, StoreKind};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Metric compared when `/analytics/comparison` names none.
pub const DEFAULT_COMPARISON_METRIC: MetricId = MetricId::CustomerSpending;

/// Query parameters for a single metric.
#[derive(Debug, Default, Deserialize)]
pub struct MetricQuery {
    pub limit: Option<String>,
    /// `relational` (default) or `document`
    pub store: Option<String>,
    /// Catalog sort order, ignored by other metrics
    pub sort: Option<String>,
}

/// Query parameters for a comparison.
#[derive(Debug, Default, Deserialize)]
pub struct ComparisonQuery {
    pub metric: Option<String>,
    pub limit: Option<String>,
}

/// A metric payload with the store that produced it.
#[derive(Debug, Serialize)]
pub struct MetricResponse {
    pub store: StoreKind,
    #[serde(flatten)]
    pub output: MetricOutput,
}

/// Parse an optional `limit` query value. Empty counts as absent.
fn parse_limit(raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("limit must be an integer, got {value:?}"))),
    }
}

/// List the metric catalog.
pub async fn index() -> Json<&'static [MetricSpec]> {
    Json(CATALOG.as_slice())
}

/// Compute one metric against one store.
#[instrument(skip_all, fields(metric = %slug))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<MetricQuery>,
) -> Result<Json<MetricResponse>> {
    let limit = parse_limit(query.limit.as_deref())?;
    let request = MetricRequest::parse(&slug, limit, query.sort.as_deref())?;

    let store = match query.store.as_deref().map(str::trim) {
        None | Some("") => StoreKind::Relational,
        Some(name) => name.parse::<StoreKind>()?,
    };
    let engine = match store {
        StoreKind::Relational => state.relational(),
        StoreKind::Document => state
            .document()
            .ok_or_else(|| CoreError::unavailable(StoreKind::Document, "not configured"))?,
    };

    let output = engine.run(&request).await?;
    tracing::debug!(rows = output.row_count(), %store, "metric computed");
    Ok(Json(MetricResponse { store, output }))
}

/// Compute one metric against both stores side by side.
#[instrument(skip_all, fields(metric = ?query.metric))]
pub async fn comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<Comparison>> {
    let metric = match query.metric.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_COMPARISON_METRIC,
        Some(slug) => MetricId::from_slug(slug)?,
    };
    let request = MetricRequest::new(metric).with_limit(parse_limit(query.limit.as_deref())?)?;

    let comparison = metrics::compare(
        Some(state.relational()),
        state.document(),
        &request,
        state.query_timeout(),
    )
    .await;
    tracing::info!(
        %metric,
        relational_ok = comparison.relational.ok,
        document_ok = comparison.document.ok,
        agree = comparison.agree(),
        "comparison finished"
    );
    Ok(Json(comparison))
}
