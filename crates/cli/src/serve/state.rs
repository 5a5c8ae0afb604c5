//! Application state and rate limiting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use effeff_storage::{FormStore, ObjectStorage};

use super::RATE_LIMIT_WINDOW_SECS;

/// Per-caller request tracker: (request count, window start time).
type CallerTracker = HashMap<String, (u64, Instant)>;

/// In-memory fixed-window rate limiter keyed by resolved caller address.
pub(crate) struct RateLimiter {
    tracker: Mutex<CallerTracker>,
    /// Maximum requests per window.
    pub(crate) max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, caller: &str) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;
        let now = Instant::now();

        // Drop stale windows so the map does not grow with one-off callers.
        tracker.retain(|_, (_, start)| {
            now.duration_since(*start).as_secs() < RATE_LIMIT_WINDOW_SECS
        });

        let entry = tracker.entry(caller.to_string()).or_insert((0, now));
        let elapsed = now.duration_since(entry.1).as_secs();

        entry.0 += 1;
        if entry.0 > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn FormStore>,
    /// None disables file uploads; file parts are then ignored.
    pub(crate) uploads: Option<Arc<dyn ObjectStorage>>,
    pub(crate) rate_limiter: RateLimiter,
}

impl AppState {
    pub(crate) fn new(
        store: Arc<dyn FormStore>,
        uploads: Option<Arc<dyn ObjectStorage>>,
        rate_limit: u64,
    ) -> Self {
        AppState {
            store,
            uploads,
            rate_limiter: RateLimiter::new(rate_limit),
        }
    }
}
