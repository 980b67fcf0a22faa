//! Concurrent page fetcher.
//!
//! Probes the feed for its page count, then requests every page of that
//! generation through a bounded pool of in-flight requests. The first
//! failing page fails the whole fetch: a partial snapshot would silently
//! hide listings, so the cycle is dropped and the next tick retries.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{AuctionFeed, ListingBatch, RawPage};
use crate::types::SniperError;

/// Maximum simultaneous page requests.
pub const DEFAULT_CONCURRENCY: usize = 24;

/// Upper bound on one complete fetch. Must stay under the poll interval.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(45);

/// Largest page count the feed may report. The live feed has well under a
/// hundred pages; anything above this is a broken response.
pub const MAX_PAGES: u32 = 10_000;

/// Every page of one feed generation.
#[derive(Debug)]
pub struct FeedSnapshot {
    /// Generation timestamp reported by the probe.
    pub as_of: DateTime<Utc>,
    /// Pages in index order.
    pub pages: Vec<RawPage>,
}

impl FeedSnapshot {
    /// Flatten all pages into listings, page order then position.
    pub fn listings(&self) -> ListingBatch {
        ListingBatch::from_pages(&self.pages)
    }
}

pub struct PageFetcher {
    concurrency: usize,
    deadline: Duration,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, DEFAULT_DEADLINE)
    }
}

impl PageFetcher {
    /// A concurrency of 0 is treated as 1.
    pub fn new(concurrency: usize, deadline: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            deadline,
        }
    }

    /// Probe, then fetch pages `[0, total_pages)`, all within the deadline.
    pub async fn fetch_all_pages(&self, feed: &dyn AuctionFeed) -> Result<FeedSnapshot, SniperError> {
        match tokio::time::timeout(self.deadline, self.fetch_generation(feed)).await {
            Ok(result) => result,
            Err(_) => Err(SniperError::FeedUnavailable(format!(
                "{}: fetch exceeded {}s deadline",
                feed.name(),
                self.deadline.as_secs_f64()
            ))),
        }
    }

    async fn fetch_generation(&self, feed: &dyn AuctionFeed) -> Result<FeedSnapshot, SniperError> {
        let meta = feed.probe().await?;
        debug!(
            feed = feed.name(),
            pages = meta.total_pages,
            as_of = %meta.last_updated,
            "Feed probed"
        );
        if meta.total_pages > MAX_PAGES {
            return Err(SniperError::FeedUnavailable(format!(
                "{}: feed reported {} pages, above the ceiling of {MAX_PAGES}",
                feed.name(),
                meta.total_pages
            )));
        }

        let semaphore = Semaphore::new(self.concurrency);
        let requests = (0..meta.total_pages).map(|page| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| SniperError::FeedUnavailable(format!("worker pool closed: {e}")))?;
                feed.fetch_page(page).await
            }
        });

        // Completion order is arbitrary; try_join_all hands results back in
        // request order and drops the remaining requests on first error.
        let pages = try_join_all(requests).await?;

        let expected = meta.last_updated.timestamp_millis();
        let drifted = pages.iter().filter(|p| p.last_updated != expected).count();
        if drifted > 0 {
            warn!(
                drifted,
                total = pages.len(),
                "Pages from a newer feed generation mixed into this cycle"
            );
        }

        info!(
            feed = feed.name(),
            pages = pages.len(),
            auctions = pages.iter().map(|p| p.auctions.len()).sum::<usize>(),
            "Feed fetched"
        );

        Ok(FeedSnapshot {
            as_of: meta.last_updated,
            pages,
        })
    }
}
