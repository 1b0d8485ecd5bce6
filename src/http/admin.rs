//! Runtime configuration endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::middleware::SharedLimiter;

/// Body of a `POST /config` request.
#[derive(Debug, Deserialize)]
pub struct TokenLimitUpdate {
    /// The token to configure.
    pub token: String,
    /// Requests per window for that token.
    pub limit: u32,
}

/// Add or update a per-token limit while the service is running.
///
/// The new limit applies from the next request; an open window for the
/// token keeps its current count.
pub async fn update_config(
    State(limiter): State<SharedLimiter>,
    Json(update): Json<TokenLimitUpdate>,
) -> Response {
    if update.token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "token must not be empty"})),
        )
            .into_response();
    }
    if update.limit == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "limit must be at least 1"})),
        )
            .into_response();
    }

    limiter.set_token_limit(&update.token, update.limit);
    info!(token = %update.token, limit = update.limit, "Token limit updated");

    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "config updated"})),
    )
        .into_response()
}
