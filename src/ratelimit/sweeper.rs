//! Background eviction of expired counters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::store::CounterStore;

/// How often the sweeper scans the store.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Periodically removes expired entries from a [`CounterStore`].
///
/// Sweeping only bounds memory: a check already treats an expired entry as
/// absent, so decisions are the same whether or not a sweep has run.
/// Nothing runs until [`StoreSweeper::start`] is called.
pub struct StoreSweeper {
    store: Arc<CounterStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    running: Option<Running>,
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl StoreSweeper {
    /// Create a sweeper over `store` with the default interval.
    pub fn new(store: Arc<CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            interval: SWEEP_INTERVAL,
            running: None,
        }
    }

    /// Override the sweep interval.
    ///
    /// A zero interval cannot drive a timer and falls back to
    /// [`SWEEP_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            warn!(
                default_secs = SWEEP_INTERVAL.as_secs(),
                "Zero sweep interval requested, using default"
            );
            self.interval = SWEEP_INTERVAL;
        } else {
            self.interval = interval;
        }
        self
    }

    /// The configured sweep interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Remove every entry expired at `now`, returning how many were removed.
    pub fn sweep(&self, now: u64) -> usize {
        sweep_store(&self.store, now)
    }

    /// Spawn the background task on the current tokio runtime.
    ///
    /// Calling this while the sweeper is already running does nothing.
    pub fn start(&mut self) {
        if self.running.is_some() {
            warn!("Store sweeper already running");
            return;
        }

        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        sweep_store(&store, clock.now_ms());
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        info!(interval_secs = period.as_secs_f64(), "Store sweeper started");
        self.running = Some(Running { shutdown, handle });
    }

    /// Stop the background task and wait for it to finish.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        // The receiver is gone only if the task already ended
        let _ = running.shutdown.send(());
        if let Err(e) = running.handle.await {
            warn!(error = %e, "Store sweeper task ended abnormally");
        }

        info!("Store sweeper stopped");
    }

    /// Whether the background task is running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

fn sweep_store(store: &CounterStore, now: u64) -> usize {
    let removed = store.remove_expired(now);
    debug!(removed = removed, remaining = store.len(), "Swept rate limit store");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::counter::CounterEntry;
    use crate::ratelimit::key::StoreKey;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn fixed_clock(now: Arc<AtomicU64>) -> Arc<dyn Clock> {
        Arc::new(move || now.load(Ordering::SeqCst))
    }

    fn seeded_store() -> Arc<CounterStore> {
        let store = Arc::new(CounterStore::new());
        store.insert(StoreKey::new("api", "a"), CounterEntry { count: 3, reset_time: 100 });
        store.insert(StoreKey::new("api", "b"), CounterEntry { count: 9, reset_time: 150 });
        store.insert(StoreKey::new("api", "c"), CounterEntry { count: 5, reset_time: 1_000 });
        store.insert(StoreKey::new("forms", "a"), CounterEntry { count: 1, reset_time: 200 });
        store
    }

    #[test]
    fn test_default_interval() {
        let store = Arc::new(CounterStore::new());
        let sweeper = StoreSweeper::new(store, fixed_clock(Arc::new(AtomicU64::new(0))));
        assert_eq!(sweeper.interval(), Duration::from_secs(300));
        assert!(!sweeper.is_running());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = seeded_store();
        let sweeper = StoreSweeper::new(Arc::clone(&store), fixed_clock(Arc::new(AtomicU64::new(0))));

        assert_eq!(sweeper.sweep(200), 2);
        assert!(store.get(&StoreKey::new("api", "a")).is_none());
        assert!(store.get(&StoreKey::new("api", "b")).is_none());
        assert_eq!(store.get(&StoreKey::new("forms", "a")).unwrap().count, 1);
        assert_eq!(store.get(&StoreKey::new("api", "c")).unwrap().count, 5);

        // A second pass at the same instant finds nothing
        assert_eq!(sweeper.sweep(200), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_falls_back_to_default() {
        let store = Arc::new(CounterStore::new());
        let mut sweeper = StoreSweeper::new(store, fixed_clock(Arc::new(AtomicU64::new(0))))
            .with_interval(Duration::ZERO);
        assert_eq!(sweeper.interval(), SWEEP_INTERVAL);

        sweeper.start();
        tokio::task::yield_now().await;
        assert!(sweeper.is_running());
        sweeper.stop().await;
        assert!(!sweeper.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep() {
        let store = seeded_store();
        let now = Arc::new(AtomicU64::new(500));
        let mut sweeper = StoreSweeper::new(Arc::clone(&store), fixed_clock(Arc::clone(&now)))
            .with_interval(Duration::from_millis(10));

        sweeper.start();
        assert!(sweeper.is_running());

        // Nothing is swept before the first full interval elapses
        tokio::task::yield_now().await;
        assert_eq!(store.len(), 4);

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&StoreKey::new("api", "c")).unwrap().count, 5);

        sweeper.stop().await;
        assert!(!sweeper.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_sweeper_leaves_store_alone() {
        let store = seeded_store();
        let now = Arc::new(AtomicU64::new(0));
        let mut sweeper = StoreSweeper::new(Arc::clone(&store), fixed_clock(Arc::clone(&now)))
            .with_interval(Duration::from_millis(10));

        sweeper.start();
        sweeper.stop().await;

        now.store(10_000, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let store = Arc::new(CounterStore::new());
        let mut sweeper = StoreSweeper::new(store, fixed_clock(Arc::new(AtomicU64::new(0))))
            .with_interval(Duration::from_millis(10));

        sweeper.start();
        sweeper.start();
        assert!(sweeper.is_running());

        sweeper.stop().await;
        sweeper.stop().await;
        assert!(!sweeper.is_running());
    }
}
