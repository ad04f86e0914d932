pub mod cache;
pub mod classify;
pub mod config;
pub mod dispatcher;
pub mod pipeline;
pub mod rate_limit;
pub mod report;
pub mod sources;
pub mod store;
pub mod traits;
pub mod types;

pub use cache::ResponseCache;
pub use classify::{classify, UNCATEGORIZED};
pub use config::AppConfig;
pub use dispatcher::{DispatchReport, FetchDispatcher, SourceFailure};
pub use pipeline::{Pipeline, RunSummary};
pub use rate_limit::RateLimiter;
pub use store::ArticleStore;
pub use traits::{FetchOutcome, SourceAdapter};
pub use types::{FetchConfig, Item, PipelineError, Result, SourceDescriptor, SourceKind, Topic};
