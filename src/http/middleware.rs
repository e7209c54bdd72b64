//! Rate limiting middleware for host application routes.
//!
//! Wrap a route or router with
//! `axum::middleware::from_fn_with_state(RouteLimit::new(limiter, "contact"), rate_limit_middleware)`.
//! Rejected requests get the policy's status code and `{"error": message}`;
//! every response carries the `X-RateLimit-*` headers.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

use crate::ratelimit::{client_key, Decision, RateLimiter};

/// Quota of the applied policy.
pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
/// Quota left before the current request was counted.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// End of the current window, epoch millis.
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Middleware state binding a route to a named limiter.
#[derive(Clone)]
pub struct RouteLimit {
    limiter: Arc<RateLimiter>,
    name: Arc<str>,
    trust_forwarded_for: bool,
}

impl RouteLimit {
    /// Limit a route with the policy registered under `name`.
    pub fn new(limiter: Arc<RateLimiter>, name: &str) -> Self {
        Self {
            limiter,
            name: Arc::from(name),
            trust_forwarded_for: true,
        }
    }

    /// Whether to key clients by `X-Forwarded-For` when present.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// The limiter name this route is checked against.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Attach the `X-RateLimit-*` headers describing `decision`.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_time));
}

/// Derive the client key for an incoming request.
pub fn request_client_key(req: &Request, trust_forwarded_for: bool) -> String {
    let forwarded = if trust_forwarded_for {
        req.headers()
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
    } else {
        None
    };

    let peer: Option<IpAddr> = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());

    client_key(forwarded, peer)
}

/// Rate-limiting middleware. Rejects with the policy's status when over quota.
pub async fn rate_limit_middleware(
    State(route): State<RouteLimit>,
    req: Request,
    next: Next,
) -> Response {
    let Some(config) = route.limiter.registry().get(&route.name) else {
        error!(limiter = %route.name, "Route is bound to an unregistered rate limiter");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "rate limiter misconfigured" })),
        )
            .into_response();
    };

    let key = request_client_key(&req, route.trust_forwarded_for);
    let now = route.limiter.clock().now_ms();
    let decision = route.limiter.check_with(&key, &route.name, &config, now);

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        info!(
            limiter = %route.name,
            client = %key,
            path = %req.uri().path(),
            "Rejected rate limited request"
        );
        let status =
            StatusCode::from_u16(config.status_code).unwrap_or(StatusCode::TOO_MANY_REQUESTS);
        (status, Json(json!({ "error": config.message }))).into_response()
    };

    apply_rate_limit_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn decision() -> Decision {
        Decision {
            allowed: true,
            remaining: 4,
            reset_time: 1_700_000_000_000,
            limit: 5,
        }
    }

    #[test]
    fn test_apply_headers() {
        let mut headers = HeaderMap::new();
        apply_rate_limit_headers(&mut headers, &decision());

        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "4");
        assert_eq!(headers["x-ratelimit-reset"], "1700000000000");
    }

    #[test]
    fn test_request_client_key_prefers_forwarded_for() {
        let mut req = http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));

        assert_eq!(request_client_key(&req, true), "203.0.113.9");
        assert_eq!(request_client_key(&req, false), "10.0.0.1");
    }

    #[test]
    fn test_request_client_key_unknown() {
        let req = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request_client_key(&req, true), "unknown");
    }

    #[test]
    fn test_route_limit_name() {
        let route = RouteLimit::new(Arc::new(RateLimiter::new()), "contact");
        assert_eq!(route.name(), "contact");
    }
}
