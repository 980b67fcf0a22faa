//! End-to-end poll cycles: feed → evaluator → history sink → report.

use rust_decimal_macros::dec;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use auction_sniper::engine::baseline::BaselineIndex;
use auction_sniper::engine::orchestrator::{CycleState, Orchestrator};
use auction_sniper::feed::fetcher::PageFetcher;
use auction_sniper::storage::{self, JsonlHistoryStore};
use auction_sniper::strategy::denylist::Denylist;
use auction_sniper::strategy::{EvaluatorConfig, ProfitEvaluator, SkipReason};
use auction_sniper::types::{Listing, SniperError};

use crate::mock_feed::{bin_auction, history, MemorySink, MockFeed};

const GEN_1: i64 = 1_700_000_060_000;
const GEN_2: i64 = GEN_1 + 60_000;

fn livid_history() -> Vec<Listing> {
    history("Livid Dagger", "EPIC", 10_000_000, 15)
}

fn sniper(feed: &MockFeed, sink: &MemorySink, past: &[Listing], config: EvaluatorConfig) -> Orchestrator {
    Orchestrator::new(
        Box::new(feed.clone()),
        PageFetcher::default(),
        ProfitEvaluator::new(config, Denylist::default()),
        BaselineIndex::build(past, 150),
        Box::new(sink.clone()),
    )
}

#[tokio::test]
async fn test_reforged_listing_priced_against_base_item() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    feed.publish(
        GEN_1,
        vec![vec![bin_auction("a1", "Withered Livid Dagger ✪✪✪", "EPIC", 7_000_000, GEN_1 - 5_000)]],
    );

    let mut orch = sniper(&feed, &sink, &livid_history(), EvaluatorConfig::default());
    let report = assert_ok!(orch.run_cycle().await);

    assert_eq!(report.deals.len(), 1);
    let deal = &report.deals[0];
    assert_eq!(deal.baseline_price, 10_000_000);
    // 10,000,000 - 7,000,000 - 70,000 tax
    assert_eq!(deal.profit, dec!(2930000));
    assert_eq!(deal.view_command(), "/viewauction a1");
    assert_eq!(sink.ids(), vec!["a1"]);
    assert_eq!(orch.state(), CycleState::Waiting);
}

#[tokio::test]
async fn test_listing_reported_once_across_cycles() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    let first = bin_auction("a1", "Livid Dagger", "EPIC", 7_000_000, GEN_1 - 5_000);
    feed.publish(GEN_1, vec![vec![first.clone()]]);

    let mut orch = sniper(&feed, &sink, &livid_history(), EvaluatorConfig::default());
    assert_eq!(assert_ok!(orch.run_cycle().await).deals.len(), 1);

    // Same listing still on the feed next minute, now joined by a new one.
    feed.publish(
        GEN_2,
        vec![vec![
            first,
            bin_auction("a2", "Livid Dagger", "EPIC", 8_000_000, GEN_2 - 1_000),
        ]],
    );
    let report = assert_ok!(orch.run_cycle().await);

    let ids: Vec<_> = report.deals.iter().map(|d| d.uuid.as_str()).collect();
    assert_eq!(ids, vec!["a2"]);
    assert_eq!(sink.ids(), vec!["a1", "a2"]);
    assert_eq!(orch.cycle_count(), 2);
}

#[tokio::test]
async fn test_failed_page_drops_cycle_then_recovers() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    feed.publish(
        GEN_1,
        vec![
            vec![bin_auction("a1", "Livid Dagger", "EPIC", 7_000_000, GEN_1 - 5_000)],
            vec![bin_auction("a2", "Livid Dagger", "EPIC", 6_000_000, GEN_1 - 5_000)],
        ],
    );
    feed.fail_page(Some(1));

    let mut orch = sniper(&feed, &sink, &livid_history(), EvaluatorConfig::default());
    let err = assert_err!(orch.run_cycle().await);
    assert!(matches!(err, SniperError::FeedUnavailable(ref msg) if msg.contains("page 1")));
    assert_eq!(orch.state(), CycleState::Waiting);
    assert!(orch.dedup().is_empty());
    assert!(sink.ids().is_empty());

    // Nothing from the failed attempt was consumed, so a retry sees both.
    feed.fail_page(None);
    let report = assert_ok!(orch.run_cycle().await);
    let ids: Vec<_> = report.deals.iter().map(|d| d.uuid.as_str()).collect();
    assert_eq!(ids, vec!["a2", "a1"]);
}

#[tokio::test]
async fn test_malformed_and_filtered_records() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    let mut auction_only = bin_auction("timed", "Livid Dagger", "EPIC", 2_000_000, GEN_1 - 5_000);
    auction_only["bin"] = json!(false);
    let mut claimed = bin_auction("claimed", "Livid Dagger", "EPIC", 2_000_000, GEN_1 - 5_000);
    claimed["claimed"] = json!(true);

    feed.publish(
        GEN_1,
        vec![vec![
            json!({ "uuid": "no-price", "item_name": "Livid Dagger" }),
            auction_only,
            claimed,
            bin_auction("skin", "Livid Dagger Skin", "EPIC", 2_000_000, GEN_1 - 5_000),
            bin_auction("old", "Livid Dagger", "EPIC", 2_000_000, GEN_1 - 90_000),
            bin_auction("cheap", "Livid Dagger", "EPIC", 500_000, GEN_1 - 5_000),
            bin_auction("dear", "Livid Dagger", "EPIC", 9_950_000, GEN_1 - 5_000),
            bin_auction("good", "Livid Dagger", "EPIC", 7_000_000, GEN_1 - 5_000),
        ]],
    );

    let mut orch = sniper(&feed, &sink, &livid_history(), EvaluatorConfig::default());
    let report = assert_ok!(orch.run_cycle().await);

    assert_eq!(report.malformed, 1);
    assert_eq!(report.listings, 7);
    assert_eq!(report.skipped.get(&SkipReason::NotOpenBin), Some(&2));
    assert_eq!(report.skipped.get(&SkipReason::Denylisted), Some(&1));
    assert_eq!(report.skipped.get(&SkipReason::Stale), Some(&1));
    assert_eq!(report.skipped.get(&SkipReason::OutOfPriceRange), Some(&1));
    assert_eq!(report.skipped.get(&SkipReason::Unprofitable), Some(&1));
    assert_eq!(report.deals.len(), 1);
    assert_eq!(sink.ids(), vec!["cheap", "dear", "good"]);
}

#[tokio::test]
async fn test_thin_history_is_not_trusted() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    feed.publish(
        GEN_1,
        vec![vec![bin_auction("a1", "Livid Dagger", "EPIC", 2_000_000, GEN_1 - 5_000)]],
    );

    let past = history("Livid Dagger", "EPIC", 10_000_000, 11);
    let mut orch = sniper(&feed, &sink, &past, EvaluatorConfig::default());
    let report = assert_ok!(orch.run_cycle().await);

    assert!(report.deals.is_empty());
    assert_eq!(report.skipped.get(&SkipReason::Illiquid), Some(&1));
}

#[tokio::test]
async fn test_persistence_failure_still_reports_deals() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    *sink.broken.lock().unwrap() = true;
    feed.publish(
        GEN_1,
        vec![vec![bin_auction("a1", "Livid Dagger", "EPIC", 7_000_000, GEN_1 - 5_000)]],
    );

    let mut orch = sniper(&feed, &sink, &livid_history(), EvaluatorConfig::default());
    let report = assert_ok!(orch.run_cycle().await);

    assert_eq!(report.deals.len(), 1);
    assert_eq!(report.persisted, 0);
    assert!(report.persistence_error.is_some());
    assert!(orch.dedup().seen("a1"));
}

#[tokio::test]
async fn test_top_k_ranking_keeps_discovery_order_on_ties() {
    let feed = MockFeed::new();
    let sink = MemorySink::default();
    let at = GEN_1 - 5_000;
    feed.publish(
        GEN_1,
        vec![
            vec![
                bin_auction("p7", "Livid Dagger", "EPIC", 7_000_000, at),
                bin_auction("p6-first", "Livid Dagger", "EPIC", 6_000_000, at),
            ],
            vec![
                bin_auction("p5", "Livid Dagger", "EPIC", 5_000_000, at),
                bin_auction("p6-second", "Livid Dagger", "EPIC", 6_000_000, at),
                bin_auction("p9", "Livid Dagger", "EPIC", 9_000_000, at),
            ],
        ],
    );

    let config = EvaluatorConfig {
        top_k: 3,
        ..EvaluatorConfig::default()
    };
    let mut orch = sniper(&feed, &sink, &livid_history(), config);
    let report = assert_ok!(orch.run_cycle().await);

    let ids: Vec<_> = report.deals.iter().map(|d| d.uuid.as_str()).collect();
    assert_eq!(ids, vec!["p5", "p6-first", "p6-second"]);
    assert_eq!(report.best().unwrap().profit, dec!(4950000));
    // Everything fresh is persisted, not only the reported top K.
    assert_eq!(sink.ids().len(), 5);
}

#[tokio::test]
async fn test_appended_history_feeds_next_baseline() {
    let path = std::env::temp_dir().join(format!("sniper_it_{}.jsonl", uuid::Uuid::new_v4()));
    let feed = MockFeed::new();
    let at = GEN_1 - 5_000;
    let pages = vec![(0..12)
        .map(|i| bin_auction(&format!("t{i}"), "Terminator", "LEGENDARY", 150_000_000 + i, at))
        .collect()];
    feed.publish(GEN_1, pages);

    let mut orch = Orchestrator::new(
        Box::new(feed.clone()),
        PageFetcher::default(),
        ProfitEvaluator::new(EvaluatorConfig::default(), Denylist::default()),
        BaselineIndex::default(),
        Box::new(assert_ok!(JsonlHistoryStore::open(&path))),
    );
    let report = assert_ok!(orch.run_cycle().await);
    assert!(report.deals.is_empty());
    assert_eq!(report.persisted, 12);

    // A restart folds the appended listings into the baseline.
    let missing = std::env::temp_dir().join(format!("sniper_it_{}.json", uuid::Uuid::new_v4()));
    let reloaded = assert_ok!(storage::load_history(&missing, Some(path.as_path())));
    let mut baseline = BaselineIndex::build(&reloaded, 150);
    assert_eq!(baseline.occurrence_count("TerminatorLEGENDARY"), 12);
    assert_eq!(baseline.resolve_price("TerminatorLEGENDARY"), Some(150_000_000));

    std::fs::remove_file(&path).unwrap();
}
