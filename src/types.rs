//! Shared types for the auction sniper.
//!
//! These types form the data model used across all modules. `Listing`
//! keeps the upstream field names so that what we persist is the same
//! record shape the feed hands us.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One auction house offer as observed on the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Unique auction identifier.
    pub uuid: String,
    pub claimed: bool,
    /// Buy-it-now flag. The feed omits it on timed auctions.
    #[serde(default)]
    pub bin: bool,
    /// Raw display name, including reforges, stars and `[Lvl N]` tags.
    pub item_name: String,
    pub category: String,
    /// Rarity tier, e.g. "COMMON" or "LEGENDARY".
    pub tier: String,
    /// Fixed price in coins.
    pub starting_bid: u64,
    /// Creation time, ms since epoch.
    pub start: i64,
}

impl Listing {
    /// Parse a raw feed record. Records missing required fields are
    /// reported as `MalformedRecord` so the caller can skip just that one.
    pub fn from_raw(value: &serde_json::Value) -> Result<Self, SniperError> {
        Listing::deserialize(value).map_err(|e| SniperError::MalformedRecord {
            id: value
                .get("uuid")
                .and_then(|v| v.as_str())
                .unwrap_or("<unknown>")
                .to_string(),
            reason: e.to_string(),
        })
    }

    /// Creation time as a `DateTime`.
    pub fn created_at(&self) -> DateTime<Utc> {
        ms_to_datetime(self.start)
    }

    /// An unclaimed buy-it-now offer.
    pub fn is_open_bin(&self) -> bool {
        self.bin && !self.claimed
    }

    /// Whether the listing was created less than `window` before `now`.
    ///
    /// Saturating, so absurd `start` values from the feed can't overflow.
    pub fn is_recent(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.timestamp_millis().saturating_sub(self.start) < window.num_milliseconds()
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} @ {} coins",
            self.uuid, self.tier, self.item_name, self.starting_bid
        )
    }
}

/// Convert a feed timestamp (ms since epoch) to `DateTime<Utc>`.
///
/// Out-of-range values clamp to the epoch rather than failing; the feed
/// only ever sends sane timestamps and a bad one just makes the listing
/// look stale.
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

// ---------------------------------------------------------------------------
// Deal
// ---------------------------------------------------------------------------

/// A listing priced below its baseline by more than the tax.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub uuid: String,
    pub item_name: String,
    pub starting_price: u64,
    pub baseline_price: u64,
    /// Baseline minus price minus tax. Always strictly positive.
    pub profit: Decimal,
}

impl Deal {
    /// In-game command that opens the auction.
    pub fn view_command(&self) -> String {
        format!("/viewauction {}", self.uuid)
    }
}

impl fmt::Display for Deal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | price {} | lowest {} | profit {}",
            self.uuid,
            self.item_name,
            self.starting_price,
            self.baseline_price,
            self.profit.round_dp(0),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum SniperError {
    /// Probe or page request failed; the cycle is abandoned.
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    /// A single record could not be parsed; only that record is skipped.
    #[error("Malformed record ({id}): {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Persistence failure ({path}): {message}")]
    PersistenceFailure { path: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
