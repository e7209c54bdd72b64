//! Rate limit decision API.
//!
//! Lets hosts that cannot embed the middleware consult the limiter over
//! HTTP: they derive the client key themselves, ask for a decision and turn
//! a denial into their own rejection response.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::middleware::apply_rate_limit_headers;
use crate::error::{FormgateError, Result};
use crate::ratelimit::{Decision, RateLimitConfig, RateLimiter};

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The rate limiter instance
    limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Create the handler state around a limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

/// Body of `POST /v1/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Client identity to count against
    pub key: String,
    /// Name of the limiter policy to apply
    pub limiter: String,
}

/// Answer of `POST /v1/check`.
///
/// Denials also carry the policy's rejection message and status code so
/// the caller can reject exactly as the middleware would.
#[derive(Debug, Serialize)]
struct CheckResponse<'a> {
    #[serde(flatten)]
    decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
}

/// One entry of `GET /v1/limiters`.
#[derive(Debug, Serialize)]
struct LimiterInfo {
    name: String,
    #[serde(flatten)]
    config: RateLimitConfig,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/limiters", get(list_limiters))
        .route("/v1/check", post(check))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "limiters": state.limiter.registry().len(),
        "entries": state.limiter.entry_count(),
    }))
}

async fn list_limiters(State(state): State<AppState>) -> Json<Vec<LimiterInfo>> {
    let limiters = state
        .limiter
        .registry()
        .entries()
        .into_iter()
        .map(|(name, config)| LimiterInfo {
            name,
            config: (*config).clone(),
        })
        .collect();

    Json(limiters)
}

/// Decide whether a request from `key` fits the named limiter's quota.
///
/// Always answers 200 with the decision; a denial is data, not an error.
#[instrument(skip(state, request), fields(limiter = %request.limiter))]
async fn check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Response> {
    if request.key.is_empty() {
        warn!("Received rate limit check with empty key");
        return Err(FormgateError::InvalidRequest("key is required".to_string()));
    }

    if request.limiter.is_empty() {
        warn!("Received rate limit check with empty limiter name");
        return Err(FormgateError::InvalidRequest(
            "limiter is required".to_string(),
        ));
    }

    let config = state
        .limiter
        .registry()
        .get(&request.limiter)
        .ok_or_else(|| FormgateError::UnknownLimiter(request.limiter.clone()))?;
    let now = state.limiter.clock().now_ms();
    let decision = state
        .limiter
        .check_with(&request.key, &request.limiter, &config, now);

    debug!(
        client = %request.key,
        allowed = decision.allowed,
        remaining = decision.remaining,
        "Rate limit decision made"
    );

    let body = CheckResponse {
        decision,
        message: (!decision.allowed).then_some(config.message.as_str()),
        status_code: (!decision.allowed).then_some(config.status_code),
    };

    let mut response = Json(body).into_response();
    apply_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}
