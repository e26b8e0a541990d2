//! Cart route handlers.
//!
//! The session only remembers which cart is the caller's. Every handler
//! extracts a [`CartSession`], runs the cart service against its context and
//! saves the (possibly changed) cart id back.

use axum::{Form, Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storelens_core::cart::{CartLine, CheckoutOutcome};
use storelens_core::model::OrderItem;
use storelens_core::{CartId, CartItemId, OrderId, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CartSession;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    #[serde(default)]
    pub product_id: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    #[serde(default)]
    pub cart_item_id: String,
}

/// Response to adding an item.
#[derive(Debug, Serialize)]
pub struct AddedResponse {
    pub cart_id: Option<CartId>,
    pub cart_item_id: CartItemId,
    pub message: &'static str,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Response to a checkout.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    Placed {
        order_id: OrderId,
        total_amount: Decimal,
        items: Vec<OrderItem>,
        message: &'static str,
    },
    Nothing {
        message: &'static str,
    },
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        let message = outcome.message();
        match outcome {
            CheckoutOutcome::Placed(order) => Self::Placed {
                order_id: order.id,
                total_amount: order.total_amount,
                items: order.items,
                message,
            },
            CheckoutOutcome::Empty | CheckoutOutcome::Closed(_) | CheckoutOutcome::Missing => {
                Self::Nothing { message }
            }
        }
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Show the current items of the caller's cart.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, cart: CartSession) -> Result<Json<Vec<CartLine>>> {
    let lines = state.carts().contents(&cart.ctx).await?;
    Ok(Json(lines))
}

/// Add a product to the caller's cart, opening one if needed.
#[instrument(skip_all)]
pub async fn add(
    State(state): State<AppState>,
    mut cart: CartSession,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<AddedResponse>> {
    let product_id = ProductId::new(required("product_id", &form.product_id)?);

    let item = state.carts().add_item(&mut cart.ctx, &product_id).await?;
    cart.save().await?;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("product_id", product_id.as_str()), ("cart_id", item.cart_id.as_str())]),
    );

    Ok(Json(AddedResponse {
        cart_id: cart.ctx.cart_id,
        cart_item_id: item.id,
        message: "Item added to cart!",
    }))
}

/// Soft-remove an item from the caller's cart.
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    cart: CartSession,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<MessageResponse>> {
    let item_id = CartItemId::new(required("cart_item_id", &form.cart_item_id)?);

    state.carts().remove_item(&cart.ctx, &item_id).await?;
    add_breadcrumb("cart", "Removed item", Some(&[("cart_item_id", item_id.as_str())]));

    Ok(Json(MessageResponse {
        message: "Item removed from cart.",
    }))
}

/// Convert the caller's cart into an order.
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    mut cart: CartSession,
) -> Result<Json<CheckoutResponse>> {
    let outcome = state.carts().checkout(&mut cart.ctx).await?;
    cart.save().await?;

    if let CheckoutOutcome::Placed(order) = &outcome {
        add_breadcrumb("cart", "Checked out", Some(&[("order_id", order.id.as_str())]));
    }
    Ok(Json(outcome.into()))
}

/// Abandon the caller's cart.
#[instrument(skip_all)]
pub async fn abandon(
    State(state): State<AppState>,
    mut cart: CartSession,
) -> Result<Json<MessageResponse>> {
    let outcome = state.carts().abandon(&mut cart.ctx).await?;
    cart.save().await?;

    add_breadcrumb("cart", outcome.message(), None);
    Ok(Json(MessageResponse {
        message: outcome.message(),
    }))
}
