//! Core rate limiter implementation.

use std::sync::Arc;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::counter::Decision;
use super::key::StoreKey;
use super::rules::{LimiterRegistry, RateLimitConfig};
use super::store::CounterStore;
use crate::error::{FormgateError, Result};

/// The fixed-window rate limiter.
///
/// Resolves limiter names against a registry and counts requests in a
/// shared store. This struct is thread-safe and can be shared across
/// multiple tasks.
pub struct RateLimiter {
    /// Named policies
    registry: Arc<LimiterRegistry>,
    /// Counters, shared with the sweeper
    store: Arc<CounterStore>,
    /// Time source for window arithmetic
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter with the built-in presets, an empty store and
    /// the wall clock.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(LimiterRegistry::with_presets()))
    }

    /// Create a rate limiter over an existing registry.
    pub fn with_registry(registry: Arc<LimiterRegistry>) -> Self {
        Self::with_parts(registry, Arc::new(CounterStore::new()), Arc::new(SystemClock))
    }

    /// Create a rate limiter from explicitly owned parts.
    pub fn with_parts(
        registry: Arc<LimiterRegistry>,
        store: Arc<CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
        }
    }

    /// Check `key` against the limiter named `name` at the current time.
    pub fn check(&self, key: &str, name: &str) -> Result<Decision> {
        self.check_at(key, name, self.clock.now_ms())
    }

    /// Check `key` against the limiter named `name` at time `now` (epoch
    /// millis).
    ///
    /// Fails only when no limiter is registered under `name`.
    pub fn check_at(&self, key: &str, name: &str, now: u64) -> Result<Decision> {
        let config = self
            .registry
            .get(name)
            .ok_or_else(|| FormgateError::UnknownLimiter(name.to_string()))?;

        Ok(self.check_with(key, name, &config, now))
    }

    /// Check `key` under `name` against an explicit policy. Never fails.
    pub fn check_with(
        &self,
        key: &str,
        name: &str,
        config: &RateLimitConfig,
        now: u64,
    ) -> Decision {
        let store_key = StoreKey::new(name, key);

        trace!(key = %store_key, now = now, "Checking rate limit");

        let (decision, opened) = self.store.check(store_key, config, now);

        if opened {
            debug!(
                limiter = %name,
                client = %key,
                max_requests = config.max_requests,
                reset_time = decision.reset_time,
                "Opened rate limit window"
            );
        }

        if !decision.allowed {
            debug!(
                limiter = %name,
                client = %key,
                reset_time = decision.reset_time,
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// The registry this limiter resolves names against.
    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }

    /// The clock used by [`RateLimiter::check`].
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get the current count for `key` under `name`.
    ///
    /// Returns `None` if no counter exists for the key.
    pub fn counter_value(&self, key: &str, name: &str) -> Option<u64> {
        self.store
            .get(&StoreKey::new(name, key))
            .map(|entry| entry.count)
    }

    /// Get the number of tracked counters.
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
