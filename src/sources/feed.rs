use crate::sources::{build_client, send_with_retries};
use crate::traits::{FetchOutcome, SourceAdapter};
use crate::types::{FetchConfig, Item, SourceDescriptor};
use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, info, warn};

/// Adapter for RSS/Atom feed sources: downloads the feed document, parses it
/// with feed-rs, and converts the most recent entries into items.
pub struct FeedAdapter {
    client: Client,
}

impl FeedAdapter {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            client: build_client(config),
        }
    }

    fn parse_entries(
        &self,
        content: &str,
        source: &SourceDescriptor,
        max_entries: usize,
    ) -> Result<Vec<Item>, String> {
        let feed = parser::parse(content.as_bytes())
            .map_err(|e| format!("failed to parse feed {}: {}", source.endpoint, e))?;

        let mut items = Vec::new();
        for entry in feed.entries.into_iter().take(max_entries) {
            // A feed entry without any link cannot be addressed; skip it and
            // keep the rest of the document.
            let url = match entry.links.first() {
                Some(link) => link.href.clone(),
                None => {
                    debug!(source_id = %source.id, "skipping feed entry without link");
                    continue;
                }
            };

            let title = entry
                .title
                .map(|t| t.content)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let summary = entry.summary.map(|s| s.content).unwrap_or_default();

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));

            items.push(Item::new(
                &source.id,
                &source.name,
                title,
                url,
                &summary,
                published_at,
            ));
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn fetch(&self, source: &SourceDescriptor, config: &FetchConfig) -> FetchOutcome {
        debug!(source_id = %source.id, url = %source.endpoint, "fetching feed");

        let request = self.client.get(&source.endpoint);
        let content = match send_with_retries(request, &source.endpoint, config).await {
            Ok(body) => body,
            Err(e) => {
                warn!(source_id = %source.id, error = %e, "feed fetch failed");
                return FetchOutcome::failed(e.to_string());
            }
        };

        match self.parse_entries(&content, source, config.max_entries_per_fetch) {
            Ok(items) => {
                info!(source_id = %source.id, count = items.len(), "fetched feed items");
                FetchOutcome::items(items)
            }
            Err(reason) => {
                warn!(source_id = %source.id, error = %reason, "feed parse failed");
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
            id: "hn".into(),
            name: "Hacker News".into(),
            kind: SourceKind::Feed,
            endpoint: "https://example.com/rss".into(),
            query: None,
            enabled: true,
            fallback: None,
            api_key_env: None,
        }
    }

    const SAMPLE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Sample</title>
  <item>
    <title>New LLM released</title>
    <link>https://example.com/llm</link>
    <description>A large language model</description>
    <pubDate>Mon, 05 Jan 2026 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title></title>
    <link>https://example.com/untitled</link>
  </item>
  <item>
    <description>no link, skipped</description>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_entries_with_defaults_and_skips_linkless() {
        let adapter = FeedAdapter::new(&FetchConfig::default());
        let items = adapter
            .parse_entries(SAMPLE_RSS, &descriptor(), 20)
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "New LLM released");
        assert_eq!(items[0].summary, "A large language model");
        assert!(items[0].published_at.is_some());
        assert_eq!(items[0].source_name, "Hacker News");

        assert_eq!(items[1].title, "Untitled");
        assert_eq!(items[1].summary, "");
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn per_fetch_entry_cap_is_applied() {
        let mut body = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>S</title>"#);
        for i in 0..30 {
            body.push_str(&format!(
                "<item><title>t{}</title><link>https://example.com/{}</link></item>",
                i, i
            ));
        }
        body.push_str("</channel></rss>");

        let adapter = FeedAdapter::new(&FetchConfig::default());
        let items = adapter.parse_entries(&body, &descriptor(), 20).unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(items[0].title, "t0");
    }

    #[test]
    fn malformed_document_is_a_single_failure() {
        let adapter = FeedAdapter::new(&FetchConfig::default());
        assert!(adapter
            .parse_entries("this is not xml", &descriptor(), 20)
            .is_err());
    }
}
