use std::collections::HashMap;

use futures::future::join_all;
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::rate_limit::RateLimiter;
use crate::sources::{FeedAdapter, QueryApiAdapter};
use crate::traits::{FetchOutcome, SourceAdapter};
use crate::types::{FetchConfig, Item, SourceDescriptor, SourceKind};

/// One source that yielded nothing this run, with the reason why.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source_id: String,
    pub reason: String,
}

/// Union of everything fetched this run. Items keep descriptor iteration
/// order, then adapter emission order; fingerprint duplicates across
/// descriptors are preserved here; deduplication belongs to the store.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub items: Vec<Item>,
    pub failures: Vec<SourceFailure>,
}

/// Routes each descriptor to the adapter for its kind, applying rate
/// limiting, response caching, and the single-fallback policy. One
/// descriptor's failure never aborts the rest.
pub struct FetchDispatcher {
    adapters: HashMap<SourceKind, Box<dyn SourceAdapter>>,
    limiter: RateLimiter,
    cache: ResponseCache,
    config: FetchConfig,
}

impl FetchDispatcher {
    pub fn new(limiter: RateLimiter, cache: ResponseCache, config: FetchConfig) -> Self {
        let mut adapters: HashMap<SourceKind, Box<dyn SourceAdapter>> = HashMap::new();
        adapters.insert(SourceKind::Feed, Box::new(FeedAdapter::new(&config)));
        adapters.insert(SourceKind::QueryApi, Box::new(QueryApiAdapter::new(&config)));
        Self {
            adapters,
            limiter,
            cache,
            config,
        }
    }

    /// Replace the adapter for a kind. Used by tests to inject stubs.
    pub fn register_adapter(&mut self, kind: SourceKind, adapter: Box<dyn SourceAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    /// Fetch all enabled descriptors concurrently and merge the results in
    /// descriptor order.
    pub async fn dispatch(&self, descriptors: &[SourceDescriptor]) -> DispatchReport {
        let by_id: HashMap<&str, &SourceDescriptor> =
            descriptors.iter().map(|d| (d.id.as_str(), d)).collect();

        let enabled: Vec<&SourceDescriptor> =
            descriptors.iter().filter(|d| d.enabled).collect();
        info!(sources = enabled.len(), "dispatching fetches");

        let results = join_all(
            enabled
                .iter()
                .map(|d| self.fetch_with_fallback(d, &by_id)),
        )
        .await;

        let mut report = DispatchReport::default();
        for (descriptor, (items, failure)) in enabled.iter().zip(results) {
            if let Some(reason) = failure {
                warn!(source_id = %descriptor.id, %reason, "source failed this run");
                report.failures.push(SourceFailure {
                    source_id: descriptor.id.clone(),
                    reason,
                });
            }
            report.items.extend(items);
        }

        info!(
            items = report.items.len(),
            failures = report.failures.len(),
            "dispatch complete"
        );
        report
    }

    /// Fetch one descriptor; on a failed or empty outcome, try its fallback
    /// descriptor exactly once (no chaining). Returns the items plus the
    /// adapter failure reason, if there was one.
    async fn fetch_with_fallback(
        &self,
        descriptor: &SourceDescriptor,
        by_id: &HashMap<&str, &SourceDescriptor>,
    ) -> (Vec<Item>, Option<String>) {
        let primary = self.fetch_cached(descriptor).await;
        if !primary.is_failure() && !primary.items.is_empty() {
            return (primary.items, None);
        }

        // An empty-but-successful source triggers the fallback like a
        // failure does, but only adapter failures are reported upward.
        let primary_reason = primary.error;

        let Some(fallback_id) = descriptor.fallback.as_deref() else {
            return (Vec::new(), primary_reason);
        };

        let Some(fallback) = by_id.get(fallback_id) else {
            warn!(
                source_id = %descriptor.id,
                fallback_id,
                "fallback refers to an unknown descriptor"
            );
            return (Vec::new(), primary_reason);
        };

        info!(source_id = %descriptor.id, fallback_id, "trying fallback source");
        let secondary = self.fetch_cached(fallback).await;
        if !secondary.is_failure() {
            return (secondary.items, primary_reason);
        }
        (Vec::new(), primary_reason.or(secondary.error))
    }

    /// Rate limiter -> cache -> adapter. Cache hits spend no rate-limit
    /// budget; only producer invocations acquire from the limiter.
    async fn fetch_cached(&self, descriptor: &SourceDescriptor) -> FetchOutcome {
        let Some(adapter) = self.adapters.get(&descriptor.kind) else {
            // Unreachable with the built-in registry; kept explicit for
            // stub registries in tests.
            return FetchOutcome::failed(format!(
                "no adapter registered for kind '{}'",
                descriptor.kind.as_str()
            ));
        };

        let key = format!(
            "{}:{}:{}",
            descriptor.id,
            descriptor.endpoint,
            descriptor.query.as_deref().unwrap_or("")
        );

        self.cache
            .get_or_fetch(&key, || async {
                self.limiter.acquire(&descriptor.id).await;
                adapter.fetch(descriptor, &self.config).await
            })
            .await
    }
}
