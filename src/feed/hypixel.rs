//! Hypixel SkyBlock auction house feed.
//!
//! Endpoint: https://api.hypixel.net/skyblock/auctions?page={n}
//! Auth: not required for this resource.
//! The feed is regenerated about once a minute; every page of a generation
//! carries the same `lastUpdated` timestamp.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{AuctionFeed, FeedMeta, RawPage};
use crate::types::SniperError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_URL: &str = "https://api.hypixel.net/skyblock/auctions";
const FEED_NAME: &str = "hypixel";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the auction feed. One instance is shared by every page
/// request of a cycle so connections are pooled.
pub struct HypixelClient {
    http: Client,
    url: String,
}

impl HypixelClient {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, request_timeout: Duration, max_idle: usize) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(max_idle)
            .user_agent("auction-sniper/0.1.0")
            .build()
            .context("Failed to build HTTP client for auction feed")?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn get_page(&self, page: u32) -> Result<RawPage, SniperError> {
        debug!(page, "Fetching auction page");

        let resp = self
            .http
            .get(&self.url)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| SniperError::FeedUnavailable(format!("page {page}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SniperError::FeedUnavailable(format!(
                "page {page}: HTTP {status}: {body}"
            )));
        }

        let raw: RawPage = resp
            .json()
            .await
            .map_err(|e| SniperError::FeedUnavailable(format!("page {page}: bad body: {e}")))?;

        if !raw.success {
            return Err(SniperError::FeedUnavailable(format!(
                "page {page}: {}",
                raw.cause.as_deref().unwrap_or("unsuccessful response")
            )));
        }
        Ok(raw)
    }
}

// ---------------------------------------------------------------------------
// AuctionFeed trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl AuctionFeed for HypixelClient {
    /// Page 0 carries the page count and generation timestamp.
    async fn probe(&self) -> Result<FeedMeta, SniperError> {
        self.get_page(0).await.map(|p| p.meta())
    }

    async fn fetch_page(&self, page: u32) -> Result<RawPage, SniperError> {
        self.get_page(page).await
    }

    fn name(&self) -> &str {
        FEED_NAME
    }
}
