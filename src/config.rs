//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section and field has a default, so an empty file (or no file) gives
//! the stock sniper. `validate` rejects settings that would break the
//! engine's invariants and is fatal at startup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::baseline::DEFAULT_HOT_CAPACITY;
use crate::engine::orchestrator::CyclePolicy;
use crate::feed::fetcher::{PageFetcher, DEFAULT_CONCURRENCY};
use crate::feed::hypixel::DEFAULT_URL;
use crate::strategy::denylist::{Denylist, DEFAULT_DENIED_CATEGORIES, DEFAULT_DENIED_WORDS};
use crate::strategy::EvaluatorConfig;
use crate::types::SniperError;

/// Poll interval the feed regenerates on. Fetch deadlines must fit inside.
const POLL_INTERVAL_SECS: u64 = 60;

/// Upper bound for time windows given in seconds (one year).
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub sniper: SniperConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Maximum simultaneous page requests.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    /// Deadline for probing and fetching every page of one cycle.
    pub cycle_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout_secs: 10,
            cycle_timeout_secs: 45,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SniperConfig {
    pub recency_window_secs: u64,
    pub min_price: u64,
    pub max_price: u64,
    /// Minimum historical listings for a baseline to be trusted.
    pub min_occurrences: u32,
    pub top_k: usize,
    pub denied_words: Vec<String>,
    pub denied_categories: Vec<String>,
}

impl Default for SniperConfig {
    fn default() -> Self {
        let defaults = EvaluatorConfig::default();
        Self {
            recency_window_secs: defaults.recency_window.num_seconds() as u64,
            min_price: defaults.min_price,
            max_price: defaults.max_price,
            min_occurrences: defaults.min_occurrences,
            top_k: defaults.top_k,
            denied_words: DEFAULT_DENIED_WORDS.iter().map(|s| s.to_string()).collect(),
            denied_categories: DEFAULT_DENIED_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Keys seeded into the hot cache at startup.
    pub hot_capacity: usize,
    /// Rebuild the hot cache every N cycles. Unset keeps promoted prices
    /// as snapshots for the life of the process.
    pub hot_refresh_cycles: Option<u64>,
    /// Forget processed ids whose listing is older than this. Unset keeps
    /// every id for the life of the process.
    pub dedup_retention_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hot_capacity: DEFAULT_HOT_CAPACITY,
            hot_refresh_cycles: None,
            dedup_retention_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Bulk BIN snapshot (JSON array) from the collector.
    pub baseline_path: String,
    /// JSON Lines file new listings are appended to.
    pub history_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            baseline_path: "./storage/data.json".to_string(),
            history_path: "./storage/history.jsonl".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), SniperError> {
        let bad = |msg: String| Err(SniperError::Configuration(msg));

        if self.feed.url.trim().is_empty() {
            return bad("feed.url is empty".into());
        }
        if self.feed.concurrency == 0 {
            return bad("feed.concurrency must be at least 1".into());
        }
        if self.feed.request_timeout_secs == 0 {
            return bad("feed.request_timeout_secs must be at least 1".into());
        }
        if self.feed.cycle_timeout_secs == 0 || self.feed.cycle_timeout_secs >= POLL_INTERVAL_SECS {
            return bad(format!(
                "feed.cycle_timeout_secs must be between 1 and {} (got {})",
                POLL_INTERVAL_SECS - 1,
                self.feed.cycle_timeout_secs
            ));
        }

        let s = &self.sniper;
        if s.recency_window_secs == 0 || s.recency_window_secs > MAX_WINDOW_SECS {
            return bad(format!(
                "sniper.recency_window_secs must be between 1 and {MAX_WINDOW_SECS} (got {})",
                s.recency_window_secs
            ));
        }
        if s.min_price > s.max_price {
            return bad(format!(
                "sniper.min_price ({}) exceeds sniper.max_price ({})",
                s.min_price, s.max_price
            ));
        }
        if s.top_k == 0 {
            return bad("sniper.top_k must be at least 1".into());
        }
        self.denylist()?;

        if self.cache.hot_refresh_cycles == Some(0) {
            return bad("cache.hot_refresh_cycles must be at least 1 when set".into());
        }
        if let Some(retention) = self.cache.dedup_retention_secs {
            if retention > MAX_WINDOW_SECS {
                return bad(format!(
                    "cache.dedup_retention_secs ({retention}) must be at most {MAX_WINDOW_SECS}"
                ));
            }
            // Evicting an id that can still pass the recency gate would let
            // the same listing be evaluated twice.
            if retention <= s.recency_window_secs {
                return bad(format!(
                    "cache.dedup_retention_secs ({retention}) must exceed sniper.recency_window_secs ({})",
                    s.recency_window_secs
                ));
            }
        }

        if self.storage.baseline_path.trim().is_empty() || self.storage.history_path.trim().is_empty() {
            return bad("storage paths must not be empty".into());
        }
        Ok(())
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            recency_window: chrono::Duration::seconds(self.sniper.recency_window_secs as i64),
            min_price: self.sniper.min_price,
            max_price: self.sniper.max_price,
            min_occurrences: self.sniper.min_occurrences,
            top_k: self.sniper.top_k,
        }
    }

    pub fn denylist(&self) -> Result<Denylist, SniperError> {
        Denylist::new(&self.sniper.denied_words, &self.sniper.denied_categories)
    }

    pub fn page_fetcher(&self) -> PageFetcher {
        PageFetcher::new(
            self.feed.concurrency,
            Duration::from_secs(self.feed.cycle_timeout_secs),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.request_timeout_secs)
    }

    pub fn cycle_policy(&self) -> CyclePolicy {
        CyclePolicy {
            hot_refresh_cycles: self.cache.hot_refresh_cycles,
            dedup_retention: self
                .cache
                .dedup_retention_secs
                .map(|s| chrono::Duration::seconds(s as i64)),
        }
    }
}
