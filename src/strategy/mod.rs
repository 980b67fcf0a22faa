//! Strategy engine: eligibility gates, tax-adjusted profit and deal
//! ranking.

pub mod denylist;
pub mod tax;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;

use crate::engine::baseline::BaselineIndex;
use crate::engine::dedup::DedupTracker;
use crate::engine::normalizer::normalize;
use crate::types::{Deal, Listing};
use denylist::Denylist;

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

pub struct EvaluatorConfig {
    /// Listings older than this (relative to feed generation time) are
    /// ignored.
    pub recency_window: Duration,
    /// Inclusive price bounds for a listing to be worth reporting.
    pub min_price: u64,
    pub max_price: u64,
    /// Minimum historical listing count before a baseline is trusted.
    pub min_occurrences: u32,
    /// Number of deals reported per cycle.
    pub top_k: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            recency_window: Duration::seconds(60),
            min_price: 1_000_000,
            max_price: 200_000_000,
            min_occurrences: 12,
            top_k: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Why a listing did not become a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Claimed, or a timed auction rather than BIN.
    NotOpenBin,
    AlreadySeen,
    /// Created outside the recency window.
    Stale,
    Denylisted,
    /// Key never appeared in the historical data.
    NoBaseline,
    OutOfPriceRange,
    /// Too few historical listings to trust the baseline.
    Illiquid,
    Unprofitable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NotOpenBin => "not_open_bin",
            SkipReason::AlreadySeen => "already_seen",
            SkipReason::Stale => "stale",
            SkipReason::Denylisted => "denylisted",
            SkipReason::NoBaseline => "no_baseline",
            SkipReason::OutOfPriceRange => "out_of_price_range",
            SkipReason::Illiquid => "illiquid",
            SkipReason::Unprofitable => "unprofitable",
        };
        write!(f, "{s}")
    }
}

/// Outcome of evaluating a single listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Deal(Deal),
    Skip(SkipReason),
}

impl Verdict {
    /// True when the listing passed the eligibility gate and was marked
    /// seen during this evaluation, i.e. it is new and belongs in history.
    pub fn is_fresh(&self) -> bool {
        match self {
            Verdict::Deal(_) => true,
            Verdict::Skip(reason) => matches!(
                reason,
                SkipReason::NoBaseline
                    | SkipReason::OutOfPriceRange
                    | SkipReason::Illiquid
                    | SkipReason::Unprofitable
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Decides, per listing, whether it is a profitable flip.
///
/// Holds no mutable state of its own; the baseline and dedup tracker are
/// owned by the caller and passed in for each evaluation.
pub struct ProfitEvaluator {
    config: EvaluatorConfig,
    denylist: Denylist,
}

impl ProfitEvaluator {
    pub fn new(config: EvaluatorConfig, denylist: Denylist) -> Self {
        Self { config, denylist }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate one listing against the baseline.
    ///
    /// Gate order: open BIN, not yet seen, recent, not denylisted. A
    /// denylisted listing is not marked seen; anything past the gate is,
    /// whether or not it turns out profitable.
    pub fn evaluate(
        &self,
        listing: &Listing,
        now: DateTime<Utc>,
        baseline: &mut BaselineIndex,
        dedup: &mut DedupTracker,
    ) -> Verdict {
        if !listing.is_open_bin() {
            return Verdict::Skip(SkipReason::NotOpenBin);
        }
        if dedup.seen(&listing.uuid) {
            return Verdict::Skip(SkipReason::AlreadySeen);
        }
        if !listing.is_recent(now, self.config.recency_window) {
            return Verdict::Skip(SkipReason::Stale);
        }
        if self.denylist.is_denied(&listing.item_name, &listing.category) {
            return Verdict::Skip(SkipReason::Denylisted);
        }

        dedup.mark_seen(&listing.uuid, listing.created_at());

        let key = normalize(&listing.item_name, &listing.tier);
        // Resolve before the price gates so cold keys get promoted even when
        // this particular listing is out of range.
        let Some(baseline_price) = baseline.resolve_price(&key) else {
            return Verdict::Skip(SkipReason::NoBaseline);
        };

        let price = listing.starting_bid;
        if price < self.config.min_price || price > self.config.max_price {
            return Verdict::Skip(SkipReason::OutOfPriceRange);
        }
        if baseline.occurrence_count(&key) < self.config.min_occurrences {
            return Verdict::Skip(SkipReason::Illiquid);
        }

        let profit = Decimal::from(baseline_price) - Decimal::from(price) - tax::listing_tax(price);
        if profit <= Decimal::ZERO {
            return Verdict::Skip(SkipReason::Unprofitable);
        }

        debug!(
            uuid = %listing.uuid,
            key = %key,
            price,
            baseline = baseline_price,
            profit = %profit,
            "Deal found"
        );

        Verdict::Deal(Deal {
            uuid: listing.uuid.clone(),
            item_name: listing.item_name.clone(),
            starting_price: price,
            baseline_price,
            profit,
        })
    }

    /// Sort by profit descending and keep the top K. The sort is stable, so
    /// equal profits stay in the order they were discovered.
    pub fn rank(&self, mut deals: Vec<Deal>) -> Vec<Deal> {
        deals.sort_by(|a, b| b.profit.cmp(&a.profit));
        deals.truncate(self.config.top_k);
        deals
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
