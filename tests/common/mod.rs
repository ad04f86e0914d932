use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use newsdesk::types::{FetchConfig, Item, SourceDescriptor, SourceKind};
use newsdesk::{FetchDispatcher, FetchOutcome, RateLimiter, ResponseCache, SourceAdapter};

/// Adapter stub with scripted per-source outcomes, consumed in order.
/// Records every call so tests can assert how often a source was hit.
#[derive(Default)]
pub struct StubAdapter {
    scripted: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    pub calls: Mutex<Vec<String>>,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, source_id: &str, outcome: FetchOutcome) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(source_id.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls_for(&self, source_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == source_id)
            .count()
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch(&self, source: &SourceDescriptor, _config: &FetchConfig) -> FetchOutcome {
        self.calls.lock().unwrap().push(source.id.clone());
        self.scripted
            .lock()
            .unwrap()
            .get_mut(&source.id)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| FetchOutcome::failed("no scripted outcome"))
    }
}

// Lets tests keep a handle to the stub after handing it to the dispatcher.
// (A newtype because the orphan rule forbids `impl SourceAdapter for Arc<StubAdapter>`.)
pub struct SharedStub(pub std::sync::Arc<StubAdapter>);

#[async_trait]
impl SourceAdapter for SharedStub {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn fetch(&self, source: &SourceDescriptor, config: &FetchConfig) -> FetchOutcome {
        self.0.fetch(source, config).await
    }
}

pub fn feed_descriptor(id: &str) -> SourceDescriptor {
    SourceDescriptor {
        id: id.to_string(),
        name: format!("Source {}", id),
        kind: SourceKind::Feed,
        endpoint: format!("https://example.com/{}/rss", id),
        query: None,
        enabled: true,
        fallback: None,
        api_key_env: None,
    }
}

pub fn item(source_id: &str, title: &str, summary: &str) -> Item {
    Item::new(
        source_id,
        &format!("Source {}", source_id),
        title.to_string(),
        format!("https://example.com/{}", title.replace(' ', "-")),
        summary,
        None,
    )
}

/// Dispatcher with generous limits and the stub wired in for feed sources.
pub fn dispatcher_with(stub: std::sync::Arc<StubAdapter>) -> FetchDispatcher {
    let limiter = RateLimiter::new(1_000, Duration::from_secs(1));
    let cache = ResponseCache::new(Duration::from_secs(300));
    let mut dispatcher = FetchDispatcher::new(limiter, cache, FetchConfig::default());
    dispatcher.register_adapter(SourceKind::Feed, Box::new(SharedStub(stub)));
    dispatcher
}
