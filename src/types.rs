use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Truncated hex length of the content fingerprint. 48 bits of hash keeps
/// collision risk negligible at expected volumes (<=10^5 items per partition).
const FINGERPRINT_LEN: usize = 12;

/// Maximum stored summary length in characters.
pub const MAX_SUMMARY_CHARS: usize = 200;

/// One ingested content record. Immutable after construction: items are only
/// ever inserted-if-absent, never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub fingerprint: String,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Build an item, deriving its fingerprint from `(source_id, url, title)`.
    /// The fingerprint is the sole deduplication key and must be stable
    /// across runs for the same logical item.
    pub fn new(
        source_id: &str,
        source_name: &str,
        title: String,
        url: String,
        summary: &str,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        let fingerprint = fingerprint(source_id, &url, &title);
        Self {
            fingerprint,
            title,
            url,
            source_name: source_name.to_string(),
            summary: truncate_chars(summary, MAX_SUMMARY_CHARS),
            published_at,
        }
    }
}

/// Deterministic short identity hash of `(source, url, title)`.
pub fn fingerprint(source_id: &str, url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    digest
        .iter()
        .take(FINGERPRINT_LEN / 2)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Truncate on a char boundary, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

/// Closed set of supported source kinds. The kind decides which adapter
/// processes a descriptor; an unknown kind in configuration is rejected at
/// validation time, never at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Feed,
    QueryApi,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feed" | "rss" => Some(Self::Feed),
            "query_api" | "newsapi" => Some(Self::QueryApi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::QueryApi => "query_api",
        }
    }
}

/// Declarative description of one content origin and how to pull from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    /// Feed URL for feed sources, API base URL for query sources.
    pub endpoint: String,
    /// Query string for query-API sources.
    pub query: Option<String>,
    pub enabled: bool,
    /// Id of another descriptor to try once when this one fails or
    /// comes back empty.
    pub fallback: Option<String>,
    /// Env var holding the API credential for query-API sources.
    pub api_key_env: Option<String>,
}

/// Keyword rules for one topic. An item matches iff its searchable text
/// contains at least one include keyword and no exclude keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
}

impl Topic {
    /// Keywords are lowercased at construction so matching is a plain
    /// substring check against case-folded text.
    pub fn new(name: &str, include: &[&str], exclude: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            include_keywords: include.iter().map(|k| k.to_lowercase()).collect(),
            exclude_keywords: exclude.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        if self
            .exclude_keywords
            .iter()
            .any(|w| text.contains(w.as_str()))
        {
            return false;
        }
        self.include_keywords
            .iter()
            .any(|k| text.contains(k.as_str()))
    }
}

/// Fetch behavior shared by all adapters.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    /// Per-call cap on entries taken from a single source fetch.
    pub max_entries_per_fetch: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "newsdesk/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 2,
            max_entries_per_fetch: 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Partition '{partition}' is corrupt: {reason}")]
    CorruptPartition { partition: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
