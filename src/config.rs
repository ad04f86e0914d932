use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::types::{PipelineError, Result, SourceDescriptor, SourceKind, Topic};

/// Raw descriptor as it appears in configuration. The kind is a free string
/// here so one bad descriptor can be dropped with a warning instead of
/// failing the whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSource {
    pub id: String,
    pub name: Option<String>,
    pub kind: String,
    pub endpoint: String,
    pub query: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub fallback: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTopic {
    pub name: String,
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    900
}

fn default_calls_per_period() -> u32 {
    30
}

fn default_period_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_calls_per_period")]
    pub calls_per_period: u32,
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
    #[serde(default)]
    pub sources: Vec<RawSource>,
    #[serde(default)]
    pub topics: Vec<RawTopic>,
}

impl Default for AppConfig {
    /// Built-in sample configuration used when no config file is present:
    /// two public feeds and three starter topics.
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            reports_dir: default_reports_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            calls_per_period: default_calls_per_period(),
            period_secs: default_period_secs(),
            sources: vec![
                RawSource {
                    id: "hn".into(),
                    name: Some("Hacker News".into()),
                    kind: "rss".into(),
                    endpoint: "https://hnrss.org/frontpage".into(),
                    query: None,
                    enabled: true,
                    fallback: None,
                    api_key_env: None,
                },
                RawSource {
                    id: "ars".into(),
                    name: Some("Ars Technica".into()),
                    kind: "rss".into(),
                    endpoint: "https://feeds.arstechnica.com/arstechnica/index".into(),
                    query: None,
                    enabled: true,
                    fallback: None,
                    api_key_env: None,
                },
            ],
            topics: vec![
                RawTopic {
                    name: "AI".into(),
                    include_keywords: vec![
                        "ai".into(),
                        "artificial intelligence".into(),
                        "machine learning".into(),
                        "gpt".into(),
                        "llm".into(),
                        "neural".into(),
                        "deep learning".into(),
                    ],
                    exclude_keywords: vec![],
                },
                RawTopic {
                    name: "Security".into(),
                    include_keywords: vec![
                        "security".into(),
                        "vulnerability".into(),
                        "breach".into(),
                        "hack".into(),
                        "cyber".into(),
                        "malware".into(),
                        "ransomware".into(),
                    ],
                    exclude_keywords: vec![],
                },
                RawTopic {
                    name: "Programming".into(),
                    include_keywords: vec![
                        "python".into(),
                        "javascript".into(),
                        "rust".into(),
                        "golang".into(),
                        "programming".into(),
                        "coding".into(),
                        "developer".into(),
                        "github".into(),
                    ],
                    exclude_keywords: vec![],
                },
            ],
        }
    }
}

impl AppConfig {
    /// Load from a TOML or JSON file, picked by extension with a TOML-first
    /// fallback when the extension is unhelpful.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if ext == "json" {
            return serde_json::from_str(&content).map_err(PipelineError::from);
        }
        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(toml_err) => serde_json::from_str(&content).map_err(|_| {
                PipelineError::Config(format!("{}: {}", path.display(), toml_err))
            }),
        }
    }

    /// Load `path` if given and present, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            Some(p) => Err(PipelineError::Config(format!(
                "config file not found: {}",
                p.display()
            ))),
            None => Ok(Self::default()),
        }
    }

    /// Validate raw sources into descriptors. Unknown kinds and duplicate
    /// ids are configuration errors fatal for that descriptor only: they are
    /// logged and skipped while the rest of the run proceeds.
    pub fn validated_sources(&self) -> Vec<SourceDescriptor> {
        let mut out: Vec<SourceDescriptor> = Vec::with_capacity(self.sources.len());
        for raw in &self.sources {
            let Some(kind) = SourceKind::parse(&raw.kind) else {
                warn!(source_id = %raw.id, kind = %raw.kind, "unknown source kind, skipping descriptor");
                continue;
            };
            if out.iter().any(|d| d.id == raw.id) {
                warn!(source_id = %raw.id, "duplicate source id, skipping descriptor");
                continue;
            }
            let name = raw
                .name
                .clone()
                .or_else(|| host_of(&raw.endpoint))
                .unwrap_or_else(|| raw.id.clone());
            out.push(SourceDescriptor {
                id: raw.id.clone(),
                name,
                kind,
                endpoint: raw.endpoint.clone(),
                query: raw.query.clone(),
                enabled: raw.enabled,
                fallback: raw.fallback.clone(),
                api_key_env: raw.api_key_env.clone(),
            });
        }
        out
    }

    /// Validate raw topics. Empty include sets are rejected here, at the
    /// configuration boundary, so the classifier never sees them.
    pub fn validated_topics(&self) -> Vec<Topic> {
        let mut out = Vec::with_capacity(self.topics.len());
        for raw in &self.topics {
            let include: Vec<String> = raw
                .include_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if include.is_empty() {
                warn!(topic = %raw.name, "topic has no include keywords, skipping");
                continue;
            }
            let exclude = raw
                .exclude_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            out.push(Topic {
                name: raw.name.clone(),
                include_keywords: include,
                exclude_keywords: exclude,
            });
        }
        out
    }
}

/// Build single-keyword topics from CLI names, e.g. `--topics ai,tech`.
pub fn topics_from_names(names: &str) -> Vec<Topic> {
    names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| Topic::new(n, &[&n.to_lowercase()], &[]))
        .collect()
}

fn host_of(endpoint: &str) -> Option<String> {
    url::Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
