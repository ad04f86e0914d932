use crate::sources::{build_client, send_with_retries};
use crate::traits::{FetchOutcome, SourceAdapter};
use crate::types::{FetchConfig, Item, SourceDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Env var consulted when a descriptor does not name its own credential var.
pub const DEFAULT_API_KEY_ENV: &str = "NEWSDESK_API_KEY";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
struct ApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<ApiArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ApiArticleSource {
    name: Option<String>,
}

/// Adapter for query-API sources (NewsAPI-style JSON endpoints): issues an
/// authenticated search request and converts the returned articles.
pub struct QueryApiAdapter {
    client: Client,
}

impl QueryApiAdapter {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            client: build_client(config),
        }
    }

    fn api_key(source: &SourceDescriptor) -> Option<String> {
        let var = source.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }

    fn convert(body: &str, source: &SourceDescriptor, max_entries: usize) -> Result<Vec<Item>, String> {
        let response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| format!("malformed API response from {}: {}", source.endpoint, e))?;

        let mut items = Vec::new();
        for article in response.articles.into_iter().take(max_entries) {
            // Entries without a URL cannot be fingerprinted meaningfully.
            let url = match article.url {
                Some(u) if !u.is_empty() => u,
                _ => {
                    debug!(source_id = %source.id, "skipping API article without url");
                    continue;
                }
            };

            let title = article
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let published_at = article
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            let source_name = article
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| source.name.clone());

            items.push(Item::new(
                &source.id,
                &source_name,
                title,
                url,
                article.description.as_deref().unwrap_or(""),
                published_at,
            ));
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for QueryApiAdapter {
    fn name(&self) -> &'static str {
        "query_api"
    }

    async fn fetch(&self, source: &SourceDescriptor, config: &FetchConfig) -> FetchOutcome {
        // Missing credentials is a "not configured" condition for this
        // descriptor, not a crash.
        let api_key = match Self::api_key(source) {
            Some(key) => key,
            None => {
                warn!(
                    source_id = %source.id,
                    env = source.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV),
                    "query API source has no credential configured, skipping"
                );
                return FetchOutcome::failed("API key not configured");
            }
        };

        let query = source.query.as_deref().unwrap_or("");
        debug!(source_id = %source.id, query, "querying API source");

        let page_size = config.max_entries_per_fetch.to_string();
        let request = self
            .client
            .get(&source.endpoint)
            .header("X-Api-Key", api_key)
            .query(&[("q", query), ("pageSize", page_size.as_str())]);

        let body = match send_with_retries(request, &source.endpoint, config).await {
            Ok(body) => body,
            Err(e) => {
                warn!(source_id = %source.id, error = %e, "API fetch failed");
                return FetchOutcome::failed(e.to_string());
            }
        };

        match Self::convert(&body, source, config.max_entries_per_fetch) {
            Ok(items) => {
                info!(source_id = %source.id, count = items.len(), "fetched API items");
                FetchOutcome::items(items)
            }
            Err(reason) => {
                warn!(source_id = %source.id, error = %reason, "API response parse failed");
                FetchOutcome::failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;

    fn descriptor() -> SourceDescriptor {
        SourceDescriptor {
            id: "newsapi".into(),
            name: "NewsAPI".into(),
            kind: SourceKind::QueryApi,
            endpoint: "https://newsapi.example/v2/everything".into(),
            query: Some("rust".into()),
            enabled: true,
            fallback: None,
            api_key_env: None,
        }
    }

    #[test]
    fn converts_articles_and_skips_urlless() {
        let body = r#"{
            "status": "ok",
            "articles": [
                {
                    "source": {"name": "Example Wire"},
                    "title": "Rust 2.0 announced",
                    "url": "https://example.com/rust",
                    "description": "Big release",
                    "publishedAt": "2026-01-05T10:00:00Z"
                },
                {"title": "no url here"},
                {
                    "url": "https://example.com/untitled",
                    "publishedAt": "not a date"
                }
            ]
        }"#;

        let items = QueryApiAdapter::convert(body, &descriptor(), 20).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Rust 2.0 announced");
        assert_eq!(items[0].source_name, "Example Wire");
        assert!(items[0].published_at.is_some());

        // Missing fields fall back to defaults rather than dropping the entry.
        assert_eq!(items[1].title, "Untitled");
        assert_eq!(items[1].source_name, "NewsAPI");
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn malformed_body_is_a_single_failure() {
        assert!(QueryApiAdapter::convert("<html>", &descriptor(), 20).is_err());
    }

    #[tokio::test]
    async fn missing_credential_is_not_configured_not_a_crash() {
        let mut source = descriptor();
        source.api_key_env = Some("NEWSDESK_TEST_KEY_THAT_IS_UNSET".into());

        let adapter = QueryApiAdapter::new(&FetchConfig::default());
        let outcome = adapter.fetch(&source, &FetchConfig::default()).await;

        assert!(outcome.is_failure());
        assert!(outcome.items.is_empty());
        assert!(outcome.error.unwrap().contains("not configured"));
    }
}
