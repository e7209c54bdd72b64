//! HTTP surface: route middleware, decision API and server.

mod error;
mod middleware;
mod server;
mod service;

pub use error::ErrorBody;
pub use middleware::{
    apply_rate_limit_headers, rate_limit_middleware, request_client_key, RouteLimit,
    RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET,
};
pub use server::HttpServer;
pub use service::{router, AppState, CheckRequest};
