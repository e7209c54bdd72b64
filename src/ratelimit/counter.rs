//! Fixed-window counter implementation.

use serde::Serialize;

use super::rules::RateLimitConfig;

/// Counting state for a single store key.
///
/// An entry lives for exactly one window. Once `now` passes `reset_time`
/// it is never advanced in place; the limiter replaces it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Requests observed in the current window, including denied ones
    pub count: u64,
    /// Epoch millis at which the current window ends
    pub reset_time: u64,
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the request fits in the quota
    pub allowed: bool,
    /// Quota left before this request was counted
    pub remaining: u64,
    /// End of the window this decision was evaluated against (epoch millis)
    pub reset_time: u64,
    /// The quota of the policy that produced this decision
    pub limit: u64,
}

impl CounterEntry {
    /// Open a fresh window starting at `now`.
    pub fn new(now: u64, window_ms: u64) -> Self {
        Self {
            count: 0,
            reset_time: now.saturating_add(window_ms),
        }
    }

    /// A window is expired strictly after its reset time.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.reset_time
    }

    /// Evaluate one request against `config` and count it.
    ///
    /// The count is bumped even when the request is denied, so a client that
    /// keeps hammering a closed window keeps growing the counter.
    pub fn record(&mut self, config: &RateLimitConfig) -> Decision {
        let allowed = self.count < config.max_requests;
        let remaining = config.max_requests.saturating_sub(self.count);

        self.count = self.count.saturating_add(1);

        Decision {
            allowed,
            remaining,
            reset_time: self.reset_time,
            limit: config.max_requests,
        }
    }
}
