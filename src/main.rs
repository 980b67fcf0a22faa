//! Auction sniper entry point.
//!
//! Loads configuration, initialises structured logging, builds the price
//! baseline from stored history, and polls the auction feed once a minute
//! until Ctrl+C.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use auction_sniper::config::AppConfig;
use auction_sniper::engine::baseline::BaselineIndex;
use auction_sniper::engine::orchestrator::Orchestrator;
use auction_sniper::feed::hypixel::HypixelClient;
use auction_sniper::storage::{self, JsonlHistoryStore};
use auction_sniper::strategy::ProfitEvaluator;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("SNIPER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        AppConfig::default()
    };

    info!(
        feed = %cfg.feed.url,
        concurrency = cfg.feed.concurrency,
        min_price = cfg.sniper.min_price,
        max_price = cfg.sniper.max_price,
        min_occurrences = cfg.sniper.min_occurrences,
        "Auction sniper starting up"
    );

    // -- Baseline --------------------------------------------------------

    let history = storage::load_history(
        Path::new(&cfg.storage.baseline_path),
        Some(Path::new(&cfg.storage.history_path)),
    )?;
    let baseline = BaselineIndex::build(&history, cfg.cache.hot_capacity);
    drop(history);

    // -- Components ------------------------------------------------------

    let feed = HypixelClient::new(&cfg.feed.url, cfg.request_timeout(), cfg.feed.concurrency)?;
    let sink = JsonlHistoryStore::open(&cfg.storage.history_path)?;
    let evaluator = ProfitEvaluator::new(cfg.evaluator_config(), cfg.denylist()?);

    let mut orchestrator = Orchestrator::new(
        Box::new(feed),
        cfg.page_fetcher(),
        evaluator,
        baseline,
        Box::new(sink),
    )
    .with_policy(cfg.cycle_policy());

    // -- Main loop -------------------------------------------------------

    info!("Entering main loop. Press Ctrl+C to stop.");
    orchestrator
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        cycles = orchestrator.cycle_count(),
        seen = orchestrator.dedup().len(),
        "Auction sniper shut down cleanly."
    );
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("auction_sniper=info"));

    if std::env::var("SNIPER_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
