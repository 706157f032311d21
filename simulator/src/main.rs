//! SealBid Simulator
//!
//! Runs a sealed-bid auction end to end against in-memory ledgers, checking
//! that escrow matches what the auction owes after every step.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bidder;
mod controller;
mod metrics;
mod scenario;

use sealbid_common::{AccountId, Amount};
use sealbid_engine::AuctionConfig;

use controller::SimulationController;
use scenario::Scenario;

/// SealBid Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "SealBid auction simulation environment")]
struct Args {
    /// Built-in scenario to run (reference, unsold)
    #[arg(short, long, conflicts_with = "scenario_file")]
    scenario: Option<String>,

    /// Scenario to load from a JSON file
    #[arg(long)]
    scenario_file: Option<std::path::PathBuf>,

    /// Number of bidders for a random auction
    #[arg(short, long, default_value = "5")]
    bidders: usize,

    /// Seller account (overrides AUCTION_SELLER)
    #[arg(long)]
    seller: Option<String>,

    /// Lot quantity (overrides AUCTION_LOT_QUANTITY)
    #[arg(long)]
    lot: Option<Amount>,

    /// Reserve price (overrides AUCTION_RESERVE_PRICE)
    #[arg(long)]
    reserve: Option<Amount>,

    /// Bidding window in seconds (overrides AUCTION_BIDDING_SECS)
    #[arg(long)]
    bidding_secs: Option<u64>,

    /// Revealing window in seconds (overrides AUCTION_REVEALING_SECS)
    #[arg(long)]
    revealing_secs: Option<u64>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the final report as JSON
    #[arg(long)]
    report: bool,

    /// Print engine metrics in Prometheus format
    #[arg(long)]
    prometheus: bool,
}

impl Args {
    fn auction_config(&self) -> AuctionConfig {
        let mut config = AuctionConfig::from_env();

        if let Some(seller) = &self.seller {
            config.seller = AccountId::new(seller.as_str());
        }
        if let Some(lot) = self.lot {
            config.lot_quantity = lot;
        }
        if let Some(reserve) = self.reserve {
            config.reserve_price = reserve;
        }
        if let Some(secs) = self.bidding_secs {
            config.bidding_window = Duration::from_secs(secs);
        }
        if let Some(secs) = self.revealing_secs {
            config.revealing_window = Duration::from_secs(secs);
        }

        config
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    info!("Starting SealBid Simulator");

    let config = args.auction_config();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let mut controller = SimulationController::new(config, args.seed);
    controller.initialize().await?;

    let scenario = match (&args.scenario, &args.scenario_file) {
        (Some(name), _) => Scenario::load(name)?,
        (None, Some(path)) => Scenario::from_file(path)?,
        (None, None) => controller.random_scenario(args.bidders),
    };

    controller.run_scenario(&scenario).await?;
    let prometheus = controller.prometheus();
    let report = controller.finish(&scenario).await?;

    info!("Simulation complete");
    info!("Operations: {}", report.metrics.total_operations);
    info!("Succeeded: {}", report.metrics.succeeded);
    info!("Expected rejections: {}", report.metrics.expected_rejections);
    info!("Unexpected outcomes: {}", report.metrics.unexpected_outcomes);
    info!("Winning bid: {}", report.auction.highest_bid);

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if args.prometheus {
        println!("{}", prometheus);
    }

    if !report.metrics.is_clean() || !report.ledgers_intact {
        return Err(anyhow::anyhow!(
            "Simulation diverged from scenario {}",
            report.scenario
        ));
    }

    Ok(())
}
