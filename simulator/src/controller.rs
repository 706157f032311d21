//! Simulation controller.

use std::sync::Arc;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sealbid_common::{AccountId, Asset, AuctionError, AuctionId, Clock, ManualClock, Phase};
use sealbid_engine::{
    spawn, AuctionConfig, AuctionEngine, AuctionHandle, AuctionSnapshot, Metrics,
    MetricsSnapshot, SharedMetrics, DEFAULT_QUEUE_DEPTH,
};
use sealbid_ledger::LedgerEngine;

use crate::bidder::BidderBook;
use crate::metrics::SimulationMetrics;
use crate::scenario::{AssertCondition, Expect, Scenario, ScenarioStep};

/// Final state of a simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub auction_id: AuctionId,
    pub metrics: SimulationMetrics,
    pub engine_metrics: MetricsSnapshot,
    pub auction: AuctionSnapshot,
    pub events_recorded: usize,
    pub ledgers_intact: bool,
}

/// Controls the simulation.
pub struct SimulationController {
    /// Auction parameters.
    config: AuctionConfig,
    /// Random number generator.
    rng: StdRng,
    /// Simulated time.
    clock: ManualClock,
    /// Lot token ledger.
    tokens: Arc<LedgerEngine>,
    /// Payment ledger.
    cash: Arc<LedgerEngine>,
    /// Counters shared with the engine.
    engine_metrics: SharedMetrics,
    /// Bidders' sealed bids.
    bidders: BidderBook,
    /// Simulation metrics.
    metrics: SimulationMetrics,
    /// Running auction service.
    service: Option<(AuctionHandle, JoinHandle<AuctionEngine>)>,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(config: AuctionConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rng,
            clock: ManualClock::default(),
            tokens: Arc::new(LedgerEngine::new(Asset::Lot)),
            cash: Arc::new(LedgerEngine::new(Asset::Payment)),
            engine_metrics: Arc::new(Metrics::new()),
            bidders: BidderBook::new(),
            metrics: SimulationMetrics::new(),
            service: None,
        }
    }

    /// Create the auction, fund its custody with the lot and start the
    /// service.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        let engine = AuctionEngine::new(
            self.config.clone(),
            self.tokens.clone(),
            self.cash.clone(),
            Arc::new(self.clock.clone()),
        )?
        .with_metrics(self.engine_metrics.clone());

        let seller = &self.config.seller;
        let supply = self
            .config
            .lot_quantity
            .checked_mul(2)
            .ok_or_else(|| anyhow::anyhow!("Lot quantity too large"))?;
        self.tokens.issue(seller, supply)?;
        self.tokens
            .move_funds(seller, engine.custody_account(), self.config.lot_quantity)?;

        info!(
            auction_id = %engine.id(),
            seller = %seller,
            lot_quantity = %self.config.lot_quantity,
            "Initialized auction custody"
        );

        self.service = Some(spawn(engine, DEFAULT_QUEUE_DEPTH));
        Ok(())
    }

    /// Build a random scenario from this controller's RNG.
    pub fn random_scenario(&mut self, bidders: usize) -> Scenario {
        Scenario::random(&mut self.rng, bidders, self.config.reserve_price)
    }

    /// Run a scenario.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        for step in &scenario.steps {
            self.execute_step(step).await?;
        }

        Ok(())
    }

    fn handle(&self) -> anyhow::Result<AuctionHandle> {
        self.service
            .as_ref()
            .map(|(handle, _)| handle.clone())
            .ok_or_else(|| anyhow::anyhow!("Simulation not initialized"))
    }

    /// Execute a single scenario step.
    async fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        let handle = self.handle()?;

        match step {
            ScenarioStep::Advance { seconds } => {
                self.clock.advance(Duration::seconds(*seconds));
                return Ok(());
            }
            ScenarioStep::EnterPhase { phase } => {
                self.enter_phase(&handle, *phase).await?;
                return Ok(());
            }
            ScenarioStep::Assert { condition } => {
                self.check_condition(&handle, condition).await?;
                return Ok(());
            }
            ScenarioStep::Start { caller, expect } => {
                let result = handle.start(AccountId::new(caller.as_str())).await;
                self.check_outcome("start", caller, result, expect);
            }
            ScenarioStep::Commit {
                bidder,
                value,
                deposit,
                reuse_digest_of,
                expect,
            } => {
                let account = AccountId::new(bidder.as_str());
                self.cash.issue(&account, *deposit)?;

                let own = self.bidders.seal(&mut self.rng, &account, *value).commitment;
                let commitment = match reuse_digest_of {
                    Some(other) => self
                        .bidders
                        .get(&AccountId::new(other.as_str()))
                        .map(|sealed| sealed.commitment)
                        .ok_or_else(|| anyhow::anyhow!("No sealed bid for {}", other))?,
                    None => own,
                };

                let result = handle.commit(account, commitment, *deposit).await;
                self.check_outcome("commit", bidder, result, expect);
            }
            ScenarioStep::Reveal {
                bidder,
                claimed_value,
                expect,
            } => {
                let account = AccountId::new(bidder.as_str());
                let (value, nonce) = match self.bidders.get(&account) {
                    Some(sealed) => (claimed_value.unwrap_or(sealed.value), sealed.nonce),
                    None => (claimed_value.unwrap_or_default(), sealbid_crypto::Nonce::random()),
                };

                let result = handle.reveal(account, value, nonce).await;
                self.check_outcome("reveal", bidder, result, expect);
            }
            ScenarioStep::Withdraw { bidder, expect } => {
                let result = handle.withdraw_excess(AccountId::new(bidder.as_str())).await;
                self.check_outcome("withdraw", bidder, result, expect);
            }
            ScenarioStep::Claim { bidder, expect } => {
                let result = handle.claim_lot(AccountId::new(bidder.as_str())).await;
                self.check_outcome("claim", bidder, result, expect);
            }
            ScenarioStep::CollectProceeds { expect } => {
                let seller = self.config.seller.clone();
                let result = handle.collect_proceeds(seller.clone()).await;
                self.check_outcome("collect_proceeds", seller.as_str(), result, expect);
            }
            ScenarioStep::ReclaimLot { expect } => {
                let seller = self.config.seller.clone();
                let result = handle.reclaim_lot(seller.clone()).await;
                self.check_outcome("reclaim_lot", seller.as_str(), result, expect);
            }
        }

        self.check_conservation(&handle).await
    }

    fn check_outcome<T>(
        &mut self,
        operation: &str,
        caller: &str,
        result: Result<T, AuctionError>,
        expect: &Expect,
    ) {
        let (matched, was_error) = match (&result, expect) {
            (Ok(_), Expect::Success) => (true, false),
            (Err(e), Expect::Error(code)) => (e.error_code() == code, true),
            (Ok(_), Expect::Error(_)) => (false, false),
            (Err(_), Expect::Success) => (false, true),
        };

        if !matched {
            warn!(
                operation,
                caller,
                expected = ?expect,
                actual = ?result.as_ref().err(),
                "Unexpected outcome"
            );
        }
        self.metrics.record_operation(matched, was_error);
    }

    async fn check_conservation(&mut self, handle: &AuctionHandle) -> anyhow::Result<()> {
        let snapshot = handle.snapshot().await?;
        let held = snapshot.escrow_balance == snapshot.outstanding_obligations;
        if !held {
            warn!(
                escrow = %snapshot.escrow_balance,
                obligations = %snapshot.outstanding_obligations,
                "Escrow does not match obligations"
            );
        }
        self.metrics.record_conservation(held);
        Ok(())
    }

    async fn enter_phase(&mut self, handle: &AuctionHandle, phase: Phase) -> anyhow::Result<()> {
        let deadlines = handle
            .snapshot()
            .await?
            .deadlines
            .ok_or_else(|| anyhow::anyhow!("Cannot enter {} before the auction starts", phase))?;

        match phase {
            Phase::Revealing => self.clock.advance_to(deadlines.bidding),
            Phase::Ended => self.clock.advance_to(deadlines.revealing),
            Phase::Created | Phase::Bidding => {
                return Err(anyhow::anyhow!("Cannot move the clock back to {}", phase));
            }
        }

        info!(phase = %phase, now = %self.clock.now(), "Clock advanced");
        Ok(())
    }

    async fn check_condition(
        &mut self,
        handle: &AuctionHandle,
        condition: &AssertCondition,
    ) -> anyhow::Result<()> {
        let snapshot = handle.snapshot().await?;

        let passed = match condition {
            AssertCondition::PhaseIs { phase } => snapshot.phase == *phase,
            AssertCondition::HighestBid { bidder, value } => {
                snapshot.highest_bid == *value
                    && snapshot.highest_bidder.as_ref().map(|a| a.as_str()) == bidder.as_deref()
            }
            AssertCondition::EscrowEquals { amount } => snapshot.escrow_balance == *amount,
            AssertCondition::LotBalanceEquals { account, amount } => {
                self.tokens.balance(&AccountId::new(account.as_str())) == *amount
            }
        };

        if !passed {
            warn!(condition = ?condition, "Assertion failed");
        }
        self.metrics.record_assertion(passed);
        Ok(())
    }

    /// Stop the service and collect the report.
    pub async fn finish(mut self, scenario: &Scenario) -> anyhow::Result<SimulationReport> {
        let (handle, task) = self
            .service
            .take()
            .ok_or_else(|| anyhow::anyhow!("Simulation not initialized"))?;
        drop(handle);
        let engine = task.await?;

        Ok(SimulationReport {
            scenario: scenario.name.clone(),
            auction_id: engine.id(),
            metrics: self.metrics,
            engine_metrics: self.engine_metrics.snapshot(),
            auction: engine.snapshot(),
            events_recorded: engine.events().len(),
            ledgers_intact: self.tokens.verify_integrity() && self.cash.verify_integrity(),
        })
    }

    /// Prometheus text for the engine counters.
    pub fn prometheus(&self) -> String {
        self.engine_metrics.to_prometheus()
    }
}
