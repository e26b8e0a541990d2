//! Product route handlers.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storelens_core::metrics::{CatalogEntry, CatalogSort, MetricId, MetricOutput, MetricRequest};
use storelens_core::{ProductId, Rating, ReviewId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    /// `newest` (default), `price_low` or `price_high`
    pub sort: Option<String>,
}

/// Rating form data.
#[derive(Debug, Deserialize)]
pub struct RateForm {
    #[serde(default)]
    pub rating: String,
    pub comment: Option<String>,
}

/// Acknowledgement of a recorded review.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub review_id: ReviewId,
    pub message: &'static str,
}

/// List active products.
#[instrument(skip_all, fields(sort = ?query.sort))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<CatalogEntry>>> {
    let sort = CatalogSort::parse_lenient(query.sort.as_deref().unwrap_or_default());
    let request = MetricRequest::new(MetricId::Catalog).with_sort(sort);

    match state.relational().run(&request).await? {
        MetricOutput::Catalog(products) => Ok(Json(products)),
        other => Err(AppError::Internal(format!(
            "catalog returned {} rows of another metric",
            other.row_count()
        ))),
    }
}

/// Record a 1-5 rating for a product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn rate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<RateForm>,
) -> Result<Json<RateResponse>> {
    let rating = Rating::parse(&form.rating)?;
    let comment = form.comment.filter(|c| !c.trim().is_empty());
    let product_id = ProductId::new(id);

    let review = state.carts().rate(&product_id, rating, comment).await?;
    add_breadcrumb(
        "review",
        "Rated product",
        Some(&[("product_id", product_id.as_str())]),
    );

    Ok(Json(RateResponse {
        review_id: review.id,
        message: "Thank you for rating!",
    }))
}
