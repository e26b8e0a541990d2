//! Request correlation for tracing and error reports.
//!
//! Each request gets an id (the upstream `x-request-id`, or a fresh UUID v4)
//! echoed in the response. Analytics requests are additionally tagged with
//! the store they read, so a Sentry event or log line from a failing store
//! can be told apart from one on the other side.

use axum::{
    extract::Request,
    http::{HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

use storelens_core::StoreKind;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Store tag for requests that read both stores.
const BOTH_STORES: &str = "both";

/// Which store an analytics request reads, if it is one.
///
/// A `store` value that does not parse yields no tag; the handler rejects
/// the request.
fn store_tag(uri: &Uri) -> Option<&'static str> {
    let metric = uri.path().strip_prefix("/analytics/")?;
    if metric.trim_end_matches('/') == "comparison" {
        return Some(BOTH_STORES);
    }

    let requested = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(key, value)| (key == "store").then_some(value))
        .filter(|value| !value.is_empty());
    match requested {
        None => Some(StoreKind::Relational.as_str()),
        Some(value) => value.parse::<StoreKind>().ok().map(StoreKind::as_str),
    }
}

/// Middleware that assigns the request id and tags the target store.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);
    let store = store_tag(request.uri());

    let span = Span::current();
    span.record("request_id", request_id.as_str());
    if let Some(store) = store {
        span.record("store", store);
    }

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
        if let Some(store) = store {
            scope.set_tag("store", store);
        }
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
