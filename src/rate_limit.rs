use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Per-source pacing gate. Calls against the same source id are spaced so the
/// long-run call rate never exceeds `calls_per_period`; `acquire` is a pacing
/// delay only, never a bounded queue.
#[derive(Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    // Next instant at which a call for this source id may proceed.
    slots: Arc<Mutex<HashMap<String, Instant>>>,
}

impl RateLimiter {
    pub fn new(calls_per_period: u32, period: Duration) -> Self {
        let calls = calls_per_period.max(1);
        Self {
            min_interval: period / calls,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait until the minimum inter-call interval for `source_id` has
    /// elapsed. Slot reservation happens under the lock; the sleep does not,
    /// so concurrent acquires for distinct sources never block each other.
    pub async fn acquire(&self, source_id: &str) {
        let slot = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let slot = match slots.get(source_id) {
                Some(next) if *next > now => *next,
                _ => now,
            };
            slots.insert(source_id.to_string(), slot + self.min_interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            let wait = slot - now;
            debug!(source_id, wait_ms = wait.as_millis() as u64, "rate limiting");
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn acquires_are_spaced_by_min_interval() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        let start = Instant::now();

        limiter.acquire("feed-a").await;
        limiter.acquire("feed-a").await;
        limiter.acquire("feed-a").await;

        // Two additional calls after the first: two 500ms gaps.
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_sources_do_not_pace_each_other() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        limiter.acquire("feed-a").await;
        limiter.acquire("feed-b").await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_for_one_source_are_serialized() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let start = Instant::now();

        let a = {
            let l = limiter.clone();
            tokio::spawn(async move { l.acquire("feed-a").await })
        };
        let b = {
            let l = limiter.clone();
            tokio::spawn(async move { l.acquire("feed-a").await })
        };
        let c = {
            let l = limiter.clone();
            tokio::spawn(async move { l.acquire("feed-a").await })
        };
        let (ra, rb, rc) = tokio::join!(a, b, c);
        ra.unwrap();
        rb.unwrap();
        rc.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
