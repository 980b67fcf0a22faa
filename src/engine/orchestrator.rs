//! Poll orchestrator.
//!
//! Drives the cycle `Fetching → Processing → Reporting → Waiting` once per
//! wall-clock minute. The feed regenerates on the minute, so each cycle
//! starts right after a regeneration. A failed fetch skips straight to
//! `Waiting`; the next minute is the retry.
//!
//! The orchestrator owns the baseline index and the dedup tracker. Both
//! are only touched from `run_cycle` after every page has arrived, so
//! neither needs a lock.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tracing::{debug, error, info, warn};

use crate::engine::baseline::BaselineIndex;
use crate::engine::dedup::DedupTracker;
use crate::feed::fetcher::PageFetcher;
use crate::feed::AuctionFeed;
use crate::storage::ListingSink;
use crate::strategy::{ProfitEvaluator, SkipReason, Verdict};
use crate::types::{ms_to_datetime, Deal, SniperError};

// ---------------------------------------------------------------------------
// State and policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Constructed, first cycle not started.
    Idle,
    Fetching,
    Processing,
    Reporting,
    /// Between cycles, waiting for the next minute boundary.
    Waiting,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Idle => write!(f, "idle"),
            CycleState::Fetching => write!(f, "fetching"),
            CycleState::Processing => write!(f, "processing"),
            CycleState::Reporting => write!(f, "reporting"),
            CycleState::Waiting => write!(f, "waiting"),
        }
    }
}

/// Optional cache maintenance run at the start of each Processing step.
#[derive(Debug, Clone, Default)]
pub struct CyclePolicy {
    /// Rebuild the hot cache every N cycles.
    pub hot_refresh_cycles: Option<u64>,
    /// Evict dedup ids for listings older than `as_of - retention`.
    pub dedup_retention: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_number: u64,
    /// Feed generation the cycle evaluated.
    pub as_of: DateTime<Utc>,
    pub pages: usize,
    pub listings: usize,
    pub malformed: usize,
    /// Listings seen for the first time this cycle.
    pub fresh: usize,
    pub persisted: usize,
    /// Set when appending to history failed. Deals are still reported.
    pub persistence_error: Option<String>,
    pub skipped: HashMap<SkipReason, usize>,
    /// Top deals, best first.
    pub deals: Vec<Deal>,
}

impl CycleReport {
    pub fn best(&self) -> Option<&Deal> {
        self.deals.first()
    }

    pub fn total_profit(&self) -> Decimal {
        self.deals.iter().map(|d| d.profit).sum()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    feed: Box<dyn AuctionFeed>,
    fetcher: PageFetcher,
    evaluator: ProfitEvaluator,
    baseline: BaselineIndex,
    dedup: DedupTracker,
    sink: Box<dyn ListingSink>,
    policy: CyclePolicy,
    state: CycleState,
    cycle_count: u64,
}

impl Orchestrator {
    pub fn new(
        feed: Box<dyn AuctionFeed>,
        fetcher: PageFetcher,
        evaluator: ProfitEvaluator,
        baseline: BaselineIndex,
        sink: Box<dyn ListingSink>,
    ) -> Self {
        Self {
            feed,
            fetcher,
            evaluator,
            baseline,
            dedup: DedupTracker::new(),
            sink,
            policy: CyclePolicy::default(),
            state: CycleState::Idle,
            cycle_count: 0,
        }
    }

    pub fn with_policy(mut self, policy: CyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn baseline(&self) -> &BaselineIndex {
        &self.baseline
    }

    pub fn dedup(&self) -> &DedupTracker {
        &self.dedup
    }

    fn transition(&mut self, next: CycleState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    /// Run cycles on every minute boundary until `shutdown` resolves.
    ///
    /// Shutdown is honoured while waiting; a cycle already in flight runs
    /// to completion first.
    pub async fn run<S>(&mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let wait = until_next_minute(Utc::now());
            debug!(wait_ms = wait.num_milliseconds(), "Waiting for next minute boundary");

            tokio::select! {
                _ = tokio::time::sleep(wait.to_std().unwrap_or_default()) => {}
                _ = &mut shutdown => {
                    info!(cycles = self.cycle_count, "Shutdown signal received");
                    self.transition(CycleState::Idle);
                    return;
                }
            }

            match self.run_cycle().await {
                Ok(report) => log_cycle_report(&report),
                Err(e) => error!(
                    cycle = self.cycle_count,
                    error = %e,
                    "Cycle failed, retrying on next minute"
                ),
            }
        }
    }

    /// Run one Fetching → Processing → Reporting pass and end in `Waiting`.
    ///
    /// Only feed errors are returned, and when they are, neither the baseline
    /// nor the dedup tracker has been touched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SniperError> {
        self.cycle_count += 1;
        let cycle = self.cycle_count;

        self.transition(CycleState::Fetching);
        let snapshot = match self.fetcher.fetch_all_pages(self.feed.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.transition(CycleState::Waiting);
                return Err(e);
            }
        };

        self.transition(CycleState::Processing);
        self.maintain(cycle, snapshot.as_of);

        let batch = snapshot.listings();
        let mut deals = Vec::new();
        let mut fresh = Vec::new();
        let mut skipped: HashMap<SkipReason, usize> = HashMap::new();

        for listing in &batch.listings {
            let verdict =
                self.evaluator
                    .evaluate(listing, snapshot.as_of, &mut self.baseline, &mut self.dedup);
            if verdict.is_fresh() {
                fresh.push(listing.clone());
            }
            match verdict {
                Verdict::Deal(deal) => deals.push(deal),
                Verdict::Skip(reason) => *skipped.entry(reason).or_default() += 1,
            }
        }

        if batch.malformed > 0 {
            warn!(cycle, malformed = batch.malformed, "Skipped malformed auction records");
        }

        self.transition(CycleState::Reporting);
        let (persisted, persistence_error) = match self.sink.append(&fresh) {
            Ok(()) => (fresh.len(), None),
            Err(e) => {
                error!(cycle, error = %e, "Failed to append new listings to history");
                (0, Some(e.to_string()))
            }
        };

        let report = CycleReport {
            cycle_number: cycle,
            as_of: snapshot.as_of,
            pages: snapshot.pages.len(),
            listings: batch.listings.len(),
            malformed: batch.malformed,
            fresh: fresh.len(),
            persisted,
            persistence_error,
            skipped,
            deals: self.evaluator.rank(deals),
        };

        self.transition(CycleState::Waiting);
        Ok(report)
    }

    fn maintain(&mut self, cycle: u64, as_of: DateTime<Utc>) {
        if let Some(cutoff) = self
            .policy
            .dedup_retention
            .and_then(|retention| as_of.checked_sub_signed(retention))
        {
            self.dedup.evict_before(cutoff);
        }
        if let Some(every) = self.policy.hot_refresh_cycles {
            if every > 0 && cycle % every == 0 {
                self.baseline.rebuild_hot_cache();
                info!(cycle, hot = self.baseline.hot_len(), "Hot cache refreshed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wall-clock alignment
// ---------------------------------------------------------------------------

/// The first whole minute strictly after `now`.
pub fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let minute = now.timestamp().div_euclid(60);
    ms_to_datetime((minute + 1) * 60_000)
}

/// Time left until the next whole minute. Always positive.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    next_minute_boundary(now) - now
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Log a human-readable cycle summary and the ranked deals.
fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle = report.cycle_number,
        as_of = %report.as_of,
        pages = report.pages,
        listings = report.listings,
        fresh = report.fresh,
        persisted = report.persisted,
        deals = report.deals.len(),
        "Cycle complete"
    );

    if let Some(err) = &report.persistence_error {
        warn!(cycle = report.cycle_number, error = %err, "History not updated this cycle");
    }

    for (rank, deal) in report.deals.iter().enumerate() {
        info!(
            rank = rank + 1,
            uuid = %deal.uuid,
            item = %deal.item_name,
            price = deal.starting_price,
            lowest = deal.baseline_price,
            profit = %deal.profit.round_dp(0),
            "Deal"
        );
    }
    if let Some(best) = report.best() {
        info!(command = %best.view_command(), "Best deal");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
