//! Session middleware configuration and the cart session extractor.
//!
//! Sessions are `PostgreSQL`-backed via tower-sessions. The only value kept
//! in a session is the shopper's cart id; handlers receive it as an explicit
//! [`CartContext`] and write it back after cart operations.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use storelens_core::CartId;
use storelens_core::cart::CartContext;

use crate::error::AppError;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "storelens_session";

/// Session key holding the current cart id.
pub const CART_ID_KEY: &str = "cart_id";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the server migrations.
#[must_use]
pub fn create_session_layer(pool: &PgPool, secure: bool) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Extractor giving a handler the caller's [`CartContext`].
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(mut cart: CartSession, State(state): State<AppState>) -> Result<Json<Value>> {
///     state.carts().add_item(&mut cart.ctx, &product_id).await?;
///     cart.save().await?;
///     ...
/// }
/// ```
pub struct CartSession {
    session: Session,
    pub ctx: CartContext,
}

impl CartSession {
    /// Persist the context's cart id, or forget it when the context has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        match &self.ctx.cart_id {
            Some(cart_id) => self.session.insert(CART_ID_KEY, cart_id).await,
            None => self
                .session
                .remove::<CartId>(CART_ID_KEY)
                .await
                .map(|_| ()),
        }
    }
}

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        // An unreadable cart id is treated as no cart
        let cart_id = session.get::<CartId>(CART_ID_KEY).await.ok().flatten();

        Ok(Self {
            session,
            ctx: CartContext { cart_id },
        })
    }
}
