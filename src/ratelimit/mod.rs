//! Rate limiting logic and state management.

mod clock;
mod counter;
mod key;
mod limiter;
mod rules;
mod store;
mod sweeper;

pub use clock::{Clock, SystemClock};
pub use counter::{CounterEntry, Decision};
pub use key::{client_key, StoreKey, UNKNOWN_CLIENT};
pub use limiter::RateLimiter;
pub use rules::{
    ConfigOverrides, LimiterFile, LimiterRegistry, Preset, RateLimitConfig, DEFAULT_MAX_REQUESTS,
    DEFAULT_MESSAGE, DEFAULT_STATUS_CODE, DEFAULT_WINDOW_MS,
};
pub use store::CounterStore;
pub use sweeper::{StoreSweeper, SWEEP_INTERVAL};
