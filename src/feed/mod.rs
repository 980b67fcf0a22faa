//! Auction feed integration.
//!
//! Defines the `AuctionFeed` trait and the raw page shape shared by every
//! feed implementation:
//! - `hypixel`: the public SkyBlock auction house endpoint
//! - `fetcher`: pulls every page of one feed generation concurrently

pub mod fetcher;
pub mod hypixel;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{ms_to_datetime, Listing, SniperError};

/// Abstraction over a paginated auction feed.
#[async_trait]
pub trait AuctionFeed: Send + Sync {
    /// Discover how many pages the current generation has and when it was
    /// generated.
    async fn probe(&self) -> Result<FeedMeta, SniperError>;

    /// Fetch one page by zero-based index.
    async fn fetch_page(&self, page: u32) -> Result<RawPage, SniperError>;

    /// Feed name for logging.
    fn name(&self) -> &str;
}

/// Feed generation metadata returned by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedMeta {
    pub total_pages: u32,
    pub last_updated: DateTime<Utc>,
}

/// One page as returned by the feed.
///
/// Auctions stay as raw JSON so a single bad record can be dropped without
/// rejecting the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub success: bool,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    /// Generation timestamp, ms since epoch.
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default)]
    pub auctions: Vec<serde_json::Value>,
    /// Error message on unsuccessful responses.
    #[serde(default)]
    pub cause: Option<String>,
}

impl RawPage {
    pub fn meta(&self) -> FeedMeta {
        FeedMeta {
            total_pages: self.total_pages,
            last_updated: ms_to_datetime(self.last_updated),
        }
    }
}

/// Listings flattened out of a set of pages.
#[derive(Debug, Default)]
pub struct ListingBatch {
    /// Parsed listings in discovery order.
    pub listings: Vec<Listing>,
    /// Records dropped because they could not be parsed.
    pub malformed: usize,
}

impl ListingBatch {
    /// Parse every auction on every page, in page order. Malformed records
    /// are counted and skipped.
    pub fn from_pages(pages: &[RawPage]) -> Self {
        let mut batch = ListingBatch::default();
        for page in pages {
            for raw in &page.auctions {
                match Listing::from_raw(raw) {
                    Ok(listing) => batch.listings.push(listing),
                    Err(e) => {
                        tracing::debug!(page = page.page, error = %e, "Skipping malformed record");
                        batch.malformed += 1;
                    }
                }
            }
        }
        batch
    }
}
