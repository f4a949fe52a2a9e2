use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::GetFeedResponse;
use tracing::debug;
use url::Url;

use crate::error::FeedError;

pub const DEFAULT_FEED_BASE_URL: &str = "https://assets.swishvideoapp.com/";
pub const DEFAULT_FEED_PATH: &str = "/Android/demo/feed.json";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote source of the full feed. One call returns every item.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn get_feed(&self) -> Result<GetFeedResponse, FeedError>;
}

pub struct HttpFeedApi {
    http: Client,
    feed_url: Url,
}

impl HttpFeedApi {
    pub fn new(base_url: &str, feed_path: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build feed http client")?;
        Ok(Self::with_client(http, feed_url(base_url, feed_path)?))
    }

    pub fn with_client(http: Client, feed_url: Url) -> Self {
        Self { http, feed_url }
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }
}

pub fn feed_url(base_url: &str, feed_path: &str) -> Result<Url> {
    let base = Url::parse(base_url).with_context(|| format!("invalid feed base url '{base_url}'"))?;
    base.join(feed_path)
        .with_context(|| format!("invalid feed path '{feed_path}' for base '{base_url}'"))
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn get_feed(&self) -> Result<GetFeedResponse, FeedError> {
        let response = self.http.get(self.feed_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        let feed: GetFeedResponse = serde_json::from_slice(&body)?;
        debug!(
            url = %self.feed_url,
            items = feed.templates_metadata.len(),
            "fetched feed"
        );
        Ok(feed)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
