//! Price baseline index.
//!
//! Holds the lowest historically observed BIN price per normalized item
//! key, plus a small "hot" cache in front of it. The hot cache starts with
//! the most frequently listed keys and is extended lazily: the first live
//! lookup of a cold key copies its current baseline price into the hot
//! cache, and that copy is never refreshed afterwards.
//!
//! The snapshot behaviour means a key promoted early keeps its promotion
//! price even if the baseline later learns a lower one. `rebuild_hot_cache`
//! resets the cache to the top-N set when a periodic refresh is wanted.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::engine::normalizer::normalize;
use crate::types::Listing;

/// Default number of keys seeded into the hot cache.
pub const DEFAULT_HOT_CAPACITY: usize = 150;

/// Per-key aggregate over the historical listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineEntry {
    /// Lowest starting price seen for the key.
    pub min_price: u64,
    /// Number of listings folded into this entry.
    pub occurrences: u32,
    /// Position of the first listing with this key; breaks occurrence ties.
    first_seen: usize,
}

/// Full baseline plus the hot snapshot cache.
#[derive(Debug, Default)]
pub struct BaselineIndex {
    entries: HashMap<String, BaselineEntry>,
    hot: HashMap<String, u64>,
    hot_capacity: usize,
    folded: usize,
}

impl BaselineIndex {
    /// Build the index from historical listings and seed the hot cache with
    /// the `hot_capacity` most frequently listed keys.
    pub fn build<'a, I>(listings: I, hot_capacity: usize) -> Self
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        let mut index = Self {
            hot_capacity,
            ..Self::default()
        };
        for listing in listings {
            index.fold(listing);
        }
        index.rebuild_hot_cache();

        info!(
            listings = index.folded,
            keys = index.entries.len(),
            hot = index.hot.len(),
            "Price baseline built"
        );
        index
    }

    /// Fold one listing into the full baseline. The hot cache is not touched.
    pub fn fold(&mut self, listing: &Listing) {
        let key = normalize(&listing.item_name, &listing.tier);
        let position = self.folded;
        self.folded += 1;

        self.entries
            .entry(key)
            .and_modify(|e| {
                e.min_price = e.min_price.min(listing.starting_bid);
                e.occurrences += 1;
            })
            .or_insert(BaselineEntry {
                min_price: listing.starting_bid,
                occurrences: 1,
                first_seen: position,
            });
    }

    /// Discard the hot cache, including lazily promoted keys, and re-seed it
    /// from the current top-N keys by occurrence.
    pub fn rebuild_hot_cache(&mut self) {
        let mut ranked: Vec<(&String, &BaselineEntry)> = self.entries.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.occurrences
                .cmp(&a.occurrences)
                .then(a.first_seen.cmp(&b.first_seen))
        });

        self.hot = ranked
            .into_iter()
            .take(self.hot_capacity)
            .map(|(key, entry)| (key.clone(), entry.min_price))
            .collect();

        debug!(hot = self.hot.len(), "Hot cache seeded");
    }

    /// Look up the baseline price for a key.
    ///
    /// Hot cache first. On a hot miss the full baseline is consulted and, if
    /// it knows the key, the price is copied into the hot cache. Unknown keys
    /// return `None` and leave the cache alone.
    pub fn resolve_price(&mut self, key: &str) -> Option<u64> {
        if let Some(&price) = self.hot.get(key) {
            return Some(price);
        }

        let price = self.entries.get(key)?.min_price;
        self.hot.insert(key.to_string(), price);
        debug!(key, price, hot = self.hot.len(), "Promoted key to hot cache");
        Some(price)
    }

    /// Historical listing count for a key, 0 if never seen.
    pub fn occurrence_count(&self, key: &str) -> u32 {
        self.entries.get(key).map_or(0, |e| e.occurrences)
    }

    /// Full baseline entry for a key.
    pub fn entry(&self, key: &str) -> Option<&BaselineEntry> {
        self.entries.get(key)
    }

    pub fn is_hot(&self, key: &str) -> bool {
        self.hot.contains_key(key)
    }

    /// Number of distinct keys in the full baseline.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hot_len(&self) -> usize {
        self.hot.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
