pub mod feed;
pub mod query_api;

pub use feed::FeedAdapter;
pub use query_api::QueryApiAdapter;

use crate::types::{FetchConfig, PipelineError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::warn;

pub(crate) fn build_client(config: &FetchConfig) -> Client {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
        .unwrap_or_default()
}

/// Send a request with bounded exponential-backoff retries on transport
/// errors and non-success statuses. Returns the response body.
pub(crate) async fn send_with_retries(
    request: RequestBuilder,
    url: &str,
    config: &FetchConfig,
) -> Result<String> {
    let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
        current_interval: Duration::from_secs(config.retry_delay_seconds),
        initial_interval: Duration::from_secs(config.retry_delay_seconds),
        max_interval: Duration::from_secs(config.retry_delay_seconds * 8),
        multiplier: 2.0,
        max_elapsed_time: Some(Duration::from_secs(config.retry_delay_seconds * 30)),
        ..Default::default()
    };

    let mut last_error: Option<PipelineError> = None;

    for attempt in 0..=config.max_retries {
        let req = match request.try_clone() {
            Some(r) => r,
            // Non-cloneable request (streaming body): single attempt only.
            None => return send_once(request, url).await,
        };

        match send_once(req, url).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                last_error = Some(e);
                if attempt < config.max_retries {
                    if let Some(delay) = backoff.next_backoff() {
                        warn!(url, attempt = attempt + 1, "fetch failed, retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| PipelineError::Fetch(format!("fetch failed with no attempts: {}", url))))
}

async fn send_once(request: RequestBuilder, url: &str) -> Result<String> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Fetch(format!("HTTP {} from {}", status, url)));
    }
    Ok(response.text().await?)
}
