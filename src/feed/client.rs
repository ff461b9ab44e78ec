//! SL deviations client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::feed::types::Deviation;

const SL_DEVIATIONS_URL: &str = "https://deviations.integration.sl.se/v1/messages";

const USER_AGENT: &str = concat!("sl-alert-relay/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for feed calls.
pub const FEED_TIMEOUT: Duration = Duration::from_secs(15);

/// What to ask the feed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub transport_mode: String,
    pub lines: Vec<i64>,
    pub include_future: bool,
}

impl FeedQuery {
    /// Query string pairs; `line` repeats once per line number.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("future", self.include_future.to_string()),
            ("transport_mode", self.transport_mode.clone()),
        ];
        pairs.extend(self.lines.iter().map(|l| ("line", l.to_string())));
        pairs
    }
}

/// Producer of report batches.
#[async_trait]
pub trait DeviationFeed: Send + Sync {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Deviation>, FeedError>;
}

/// HTTP client for the SL deviations API.
pub struct SlFeedClient {
    base_url: String,
    client: reqwest::Client,
}

impl SlFeedClient {
    pub fn new() -> Result<Self, FeedError> {
        Self::with_base_url(SL_DEVIATIONS_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(FEED_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedError::Request(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl DeviationFeed for SlFeedClient {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Deviation>, FeedError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&query.query_pairs())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout(FEED_TIMEOUT)
            } else {
                FeedError::Decode(e.to_string())
            }
        })?;

        let deviations = parse_feed_payload(payload);
        debug!(count = deviations.len(), mode = %query.transport_mode, "Fetched deviations");
        Ok(deviations)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout(FEED_TIMEOUT)
    } else {
        FeedError::Request(e.to_string())
    }
}

/// Decode a feed payload. A non-array payload yields an empty batch; array
/// elements that do not decode are skipped.
pub fn parse_feed_payload(payload: serde_json::Value) -> Vec<Deviation> {
    let serde_json::Value::Array(items) = payload else {
        warn!("Feed returned a non-array payload, treating as empty");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Deviation>(item) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable deviation");
                None
            }
        })
        .collect()
}
