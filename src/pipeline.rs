use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::classify::{classify, UNCATEGORIZED};
use crate::config::AppConfig;
use crate::dispatcher::{FetchDispatcher, SourceFailure};
use crate::rate_limit::RateLimiter;
use crate::report::write_report;
use crate::store::ArticleStore;
use crate::types::{FetchConfig, Result, SourceDescriptor, Topic};

/// What one run produced: how many items came back, which sources failed,
/// and how many records each partition gained.
#[derive(Debug)]
pub struct RunSummary {
    pub fetched: usize,
    pub failures: Vec<SourceFailure>,
    pub new_by_partition: BTreeMap<String, usize>,
    pub report_path: Option<PathBuf>,
}

/// One run's worth of pipeline state: dispatcher (rate limiter, response
/// cache, adapters) plus the partition store. Constructed explicitly per run;
/// nothing here is global.
pub struct Pipeline {
    dispatcher: FetchDispatcher,
    store: ArticleStore,
    reports_dir: PathBuf,
}

impl Pipeline {
    pub fn new(dispatcher: FetchDispatcher, store: ArticleStore, reports_dir: PathBuf) -> Self {
        Self {
            dispatcher,
            store,
            reports_dir,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let limiter = RateLimiter::new(
            config.calls_per_period,
            Duration::from_secs(config.period_secs),
        );
        let cache = ResponseCache::new(Duration::from_secs(config.cache_ttl_secs));
        let dispatcher = FetchDispatcher::new(limiter, cache, FetchConfig::default());
        let store = ArticleStore::new(&config.data_dir);
        Self::new(dispatcher, store, PathBuf::from(&config.reports_dir))
    }

    /// Fetch, classify, and persist one run. Transient per-source failures
    /// only shrink the result set; storage corruption halts the run with an
    /// error naming the partition.
    pub async fn run_once(
        &self,
        descriptors: &[SourceDescriptor],
        topics: &[Topic],
        top_n: usize,
    ) -> Result<RunSummary> {
        let report = self.dispatcher.dispatch(descriptors).await;
        if report.items.is_empty() {
            warn!("no items fetched from any source");
        }

        let classified = classify(&report.items, topics);

        let mut new_by_partition = BTreeMap::new();
        let added = self.store.merge("all", &report.items).await?;
        new_by_partition.insert("all".to_string(), added);

        for (topic, items) in &classified {
            if topic == UNCATEGORIZED {
                continue;
            }
            let added = self.store.merge(topic, items).await?;
            new_by_partition.insert(topic.clone(), added);
        }

        let report_path = if classified.is_empty() {
            None
        } else {
            Some(write_report(&classified, &self.reports_dir, top_n)?)
        };

        info!(
            fetched = report.items.len(),
            failures = report.failures.len(),
            "run complete"
        );

        Ok(RunSummary {
            fetched: report.items.len(),
            failures: report.failures,
            new_by_partition,
            report_path,
        })
    }
}
