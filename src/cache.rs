use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::traits::FetchOutcome;

struct Entry {
    outcome: FetchOutcome,
    fetched_at: Instant,
}

/// Short-TTL response cache keyed by `(source_id, query_signature)`. Entries
/// live for this process run only; a miss is never an error, only a cost.
///
/// Population is acquire-or-wait: the per-key mutex is held across the
/// producer call, so two concurrent misses for the same key invoke the
/// producer once and the second caller reuses the fresh result.
#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, Arc<Mutex<Option<Entry>>>>>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the cached outcome for `key` if it is younger than the TTL,
    /// otherwise run `producer`, store its result, and return it. Failed
    /// outcomes are not cached, so a later call may retry the source.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, producer: F) -> FetchOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };

        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!(key, "response cache hit");
                return entry.outcome.clone();
            }
        }

        let outcome = producer().await;
        if !outcome.is_failure() {
            *guard = Some(Entry {
                outcome: outcome.clone(),
                fetched_at: Instant::now(),
            });
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn outcome_with(n: usize) -> FetchOutcome {
        let item = crate::types::Item::new(
            "s",
            "Source",
            format!("title-{}", n),
            format!("https://example.com/{}", n),
            "",
            None,
        );
        FetchOutcome::items(vec![item])
    }

    #[tokio::test]
    async fn second_call_within_ttl_reuses_result() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch("hn:frontpage", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                outcome_with(1)
            })
            .await;
        let second = cache
            .get_or_fetch("hn:frontpage", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                outcome_with(2)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.items, second.items);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_invokes_producer_again() {
        let cache = ResponseCache::new(Duration::from_secs(1));
        let calls = AtomicUsize::new(0);

        cache
            .get_or_fetch("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                outcome_with(1)
            })
            .await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        cache
            .get_or_fetch("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                outcome_with(2)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::failed("boom")
            })
            .await;
        assert!(first.is_failure());

        let second = cache
            .get_or_fetch("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                outcome_with(1)
            })
            .await;
        assert!(!second.is_failure());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_invoke_producer_once() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        outcome_with(1)
                    })
                    .await
            }));
        }
        for h in handles {
            assert!(!h.await.unwrap().is_failure());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
