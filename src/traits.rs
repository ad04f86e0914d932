use crate::types::{FetchConfig, Item, SourceDescriptor};
use async_trait::async_trait;

/// Result of one adapter call. Adapter-internal errors never cross this
/// boundary as `Err`: a total failure is an empty item set with `error` set,
/// a partial failure skips the offending entries and keeps the rest.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub items: Vec<Item>,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn items(items: Vec<Item>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Trait for pulling content from one kind of source (feed, query API, ...).
/// One implementation per `SourceKind`; the dispatcher owns the mapping.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Human-readable adapter name for logs.
    fn name(&self) -> &'static str;

    /// Fetch items described by `source`. Performs network I/O.
    async fn fetch(&self, source: &SourceDescriptor, config: &FetchConfig) -> FetchOutcome;
}
