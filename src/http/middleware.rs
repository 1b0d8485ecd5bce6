//! Admission-control middleware for the HTTP boundary.
//!
//! Every request on every route passes through here. The limiter's
//! decision maps to either pass-through (with rate-limit headers added
//! to the downstream response) or an immediate `429 Too Many Requests`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::ratelimit::{CheckOutcome, Decision, FixedWindowStore, RateLimiter};

/// Request header carrying the client's API token.
pub const API_KEY_HEADER: &str = "API_KEY";

/// The limiter as shared by the router and the middleware.
pub type SharedLimiter = Arc<RateLimiter<FixedWindowStore>>;

/// Decide admission for one request and forward or reject it.
pub async fn rate_limit(
    State(limiter): State<SharedLimiter>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = limiter.check(token, &peer.to_string());

    match outcome.decision {
        Decision::Admit => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(outcome.limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(outcome.remaining));
            response
        }
        Decision::Reject => rejection_response(&outcome),
    }
}

/// Build the 429 response for a rejected request.
///
/// `Retry-After` is whole seconds until the window resets, rounded up so
/// a client that honors it never retries into the same window.
fn rejection_response(outcome: &CheckOutcome) -> Response {
    let retry_after_secs = outcome.retry_after.as_secs_f64().ceil() as u64;

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "rate limit exceeded",
            "limit": outcome.limit,
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::RETRY_AFTER,
        HeaderValue::from(retry_after_secs),
    );
    headers.insert("x-ratelimit-limit", HeaderValue::from(outcome.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
    response
}
