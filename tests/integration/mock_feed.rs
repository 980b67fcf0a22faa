//! In-memory auction feed and history sink for integration testing.
//!
//! The feed serves whatever generation the test installs and can be told
//! to fail; the sink records every append so tests can inspect what would
//! have reached disk.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use auction_sniper::feed::{AuctionFeed, FeedMeta, RawPage};
use auction_sniper::storage::ListingSink;
use auction_sniper::types::{ms_to_datetime, Listing, SniperError};

/// One feed generation: a timestamp and its pages.
#[derive(Clone, Default)]
struct Generation {
    last_updated: i64,
    pages: Vec<Vec<Value>>,
}

/// A controllable feed. Clones share state, so a test can keep a handle
/// after boxing one into the orchestrator.
#[derive(Clone, Default)]
pub struct MockFeed {
    generation: Arc<Mutex<Generation>>,
    failing_page: Arc<Mutex<Option<u32>>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the served generation.
    pub fn publish(&self, last_updated: i64, pages: Vec<Vec<Value>>) {
        *self.generation.lock().unwrap() = Generation { last_updated, pages };
    }

    /// Make `page` fail until cleared with `None`.
    pub fn fail_page(&self, page: Option<u32>) {
        *self.failing_page.lock().unwrap() = page;
    }
}

#[async_trait]
impl AuctionFeed for MockFeed {
    async fn probe(&self) -> Result<FeedMeta, SniperError> {
        let generation = self.generation.lock().unwrap();
        Ok(FeedMeta {
            total_pages: generation.pages.len() as u32,
            last_updated: ms_to_datetime(generation.last_updated),
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<RawPage, SniperError> {
        if *self.failing_page.lock().unwrap() == Some(page) {
            return Err(SniperError::FeedUnavailable(format!("page {page}: HTTP 502")));
        }
        let generation = self.generation.lock().unwrap();
        let auctions = generation
            .pages
            .get(page as usize)
            .cloned()
            .ok_or_else(|| SniperError::FeedUnavailable(format!("page {page}: not found")))?;
        Ok(RawPage {
            success: true,
            page,
            total_pages: generation.pages.len() as u32,
            last_updated: generation.last_updated,
            auctions,
            cause: None,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Sink that keeps appended listings in memory.
#[derive(Clone, Default)]
pub struct MemorySink {
    pub appended: Arc<Mutex<Vec<Listing>>>,
    pub broken: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn ids(&self) -> Vec<String> {
        self.appended.lock().unwrap().iter().map(|l| l.uuid.clone()).collect()
    }
}

impl ListingSink for MemorySink {
    fn append(&mut self, listings: &[Listing]) -> Result<(), SniperError> {
        if *self.broken.lock().unwrap() {
            return Err(SniperError::PersistenceFailure {
                path: "memory".into(),
                message: "read-only".into(),
            });
        }
        self.appended.lock().unwrap().extend_from_slice(listings);
        Ok(())
    }
}

/// Raw BIN auction as the feed would serve it.
pub fn bin_auction(uuid: &str, name: &str, tier: &str, price: u64, start: i64) -> Value {
    json!({
        "uuid": uuid,
        "auctioneer": "0f8d6c3a",
        "claimed": false,
        "bin": true,
        "item_name": name,
        "category": "weapon",
        "tier": tier,
        "starting_bid": price,
        "start": start,
        "end": start + 86_400_000,
    })
}

/// `count` historical BIN listings of one item at one price.
pub fn history(name: &str, tier: &str, price: u64, count: usize) -> Vec<Listing> {
    (0..count)
        .map(|i| Listing {
            uuid: format!("hist-{name}-{price}-{i}"),
            claimed: false,
            bin: true,
            item_name: name.to_string(),
            category: "weapon".to_string(),
            tier: tier.to_string(),
            starting_bid: price,
            start: 1_600_000_000_000,
        })
        .collect()
}
