//! Client identity and store key handling.

use std::net::IpAddr;

/// Client key used when nothing identifies the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the client key for a request.
///
/// Takes the first comma-separated value of the forwarded-for header when
/// present and non-blank, then the transport peer address, then
/// [`UNKNOWN_CLIENT`]. The result is never empty. Nothing here authenticates
/// the value; a forwarded-for header is whatever the client sent.
pub fn client_key(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
    let forwarded = forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());

    match (forwarded, peer) {
        (Some(first), _) => first.to_string(),
        (None, Some(ip)) => ip.to_string(),
        (None, None) => UNKNOWN_CLIENT.to_string(),
    }
}

/// A key that identifies one counter in the store.
///
/// Counters are scoped to the limiter that owns them, so the same client
/// hitting two differently-limited routes is counted once per route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// The limiter policy name
    pub limiter: String,
    /// The client identity
    pub client: String,
}

impl StoreKey {
    /// Create a new store key.
    pub fn new(limiter: &str, client: &str) -> Self {
        Self {
            limiter: limiter.to_string(),
            client: client.to_string(),
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.limiter, self.client)
    }
}
