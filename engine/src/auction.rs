//! The auction aggregate: lifecycle, commitments and reveals.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use sealbid_common::{
    checked_sum, AccountId, Amount, AuctionError, AuctionId, Clock, Phase, Result, Timestamp,
};
use sealbid_crypto::{Commitment, Nonce};
use sealbid_ledger::{AssetLedger, LedgerError, PaymentRail};

use crate::bid_ledger::BidLedger;
use crate::config::AuctionConfig;
use crate::events::{AuctionEvent, EventLog, EventRecord};
use crate::metrics::{Metrics, SharedMetrics};
use crate::phase::{Deadlines, PhaseController};
use crate::registry::{BidderRecord, CommitmentRegistry};

/// One sealed-bid auction for one lot.
///
/// Every mutation takes `&mut self`, so the host decides the serialization
/// order. Preconditions are checked before any state is written; outbound
/// transfers run after the state change they settle and undo it on failure.
pub struct AuctionEngine {
    pub(crate) id: AuctionId,
    pub(crate) config: AuctionConfig,
    pub(crate) custody: AccountId,
    pub(crate) phases: PhaseController,
    pub(crate) registry: CommitmentRegistry,
    pub(crate) bids: BidLedger,
    /// Lot has left custody, to the winner or back to the seller.
    pub(crate) settled: bool,
    pub(crate) proceeds_collected: bool,
    pub(crate) events: EventLog,
    pub(crate) lot: Arc<dyn AssetLedger>,
    pub(crate) payments: Arc<dyn PaymentRail>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: SharedMetrics,
}

impl AuctionEngine {
    /// Create an auction in `Created`.
    pub fn new(
        config: AuctionConfig,
        lot: Arc<dyn AssetLedger>,
        payments: Arc<dyn PaymentRail>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_id(AuctionId::new(), config, lot, payments, clock)
    }

    /// Create an auction with a caller-chosen id.
    pub fn with_id(
        id: AuctionId,
        config: AuctionConfig,
        lot: Arc<dyn AssetLedger>,
        payments: Arc<dyn PaymentRail>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate().map_err(AuctionError::InvalidConfig)?;
        let custody = AccountId::custody(id);
        if config.seller == custody {
            return Err(AuctionError::InvalidConfig(format!(
                "seller cannot be the custody account {}",
                custody
            )));
        }
        let phases = PhaseController::new(config.bidding_window, config.revealing_window)?;

        info!(
            auction_id = %id,
            seller = %config.seller,
            lot_quantity = %config.lot_quantity,
            reserve_price = %config.reserve_price,
            "Auction created"
        );

        Ok(Self {
            id,
            custody,
            config,
            phases,
            registry: CommitmentRegistry::new(),
            bids: BidLedger::new(),
            settled: false,
            proceeds_collected: false,
            events: EventLog::new(),
            lot,
            payments,
            clock,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Report into a shared metrics instance.
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Open bidding. Seller only, once, and only when custody already holds
    /// the lot.
    #[instrument(skip(self), fields(auction_id = %self.id))]
    pub fn start(&mut self, caller: &AccountId) -> Result<Deadlines> {
        let now = self.clock.now();

        let deadlines = self
            .check_start(caller, now)
            .map_err(|e| self.rejected("start", caller, e))?;

        self.phases.open(deadlines);
        self.record(
            now,
            AuctionEvent::Started {
                seller: caller.clone(),
                lot_quantity: self.config.lot_quantity,
                deadlines,
            },
        );

        info!(
            bidding_deadline = %deadlines.bidding,
            revealing_deadline = %deadlines.revealing,
            "Bidding opened"
        );
        Ok(deadlines)
    }

    fn check_start(&self, caller: &AccountId, now: Timestamp) -> Result<Deadlines> {
        if *caller != self.config.seller {
            return Err(AuctionError::NotSeller(caller.clone()));
        }

        let deadlines = self.phases.plan_start(now)?;

        let available = self.lot.balance_of(&self.custody);
        if available < self.config.lot_quantity {
            return Err(AuctionError::InsufficientLotFunding {
                required: self.config.lot_quantity,
                available,
            });
        }

        Ok(deadlines)
    }

    /// Submit a sealed bid and take `deposit` into custody.
    #[instrument(skip(self, commitment), fields(auction_id = %self.id))]
    pub fn commit(
        &mut self,
        caller: &AccountId,
        commitment: Commitment,
        deposit: Amount,
    ) -> Result<()> {
        let now = self.clock.now();

        self.phases
            .require(now, Phase::Bidding)
            .and_then(|_| self.check_participant(caller))
            .and_then(|_| {
                self.registry
                    .check_commit(caller, deposit, self.config.reserve_price)
            })
            .map_err(|e| self.rejected("commit", caller, e))?;

        // Inbound; nothing to undo if the rail refuses it.
        self.payments
            .collect(caller, &self.custody, deposit)
            .map_err(|e| self.transfer_failed("commit", caller, e))?;

        self.registry.insert(caller.clone(), commitment, deposit, now);
        self.metrics.commit_accepted();
        self.refresh_escrow_gauge();
        self.record(
            now,
            AuctionEvent::Committed {
                bidder: caller.clone(),
                commitment,
                deposit,
            },
        );

        info!(deposit = %deposit, "Commitment accepted");
        Ok(())
    }

    fn check_participant(&self, caller: &AccountId) -> Result<()> {
        // A self-collect would record a deposit that never moved.
        if *caller == self.custody {
            return Err(AuctionError::CustodyAccount(caller.clone()));
        }
        Ok(())
    }

    /// Disclose a committed bid.
    #[instrument(skip(self, nonce), fields(auction_id = %self.id))]
    pub fn reveal(&mut self, caller: &AccountId, value: Amount, nonce: &Nonce) -> Result<()> {
        let now = self.clock.now();

        self.phases
            .require(now, Phase::Revealing)
            .and_then(|_| self.registry.check_reveal(caller, value, nonce))
            .map_err(|e| self.rejected("reveal", caller, e))?;

        self.registry.mark_revealed(caller, value, now);
        let new_leader = self.bids.observe(caller, value);
        self.metrics.reveal_accepted(new_leader);

        self.record(
            now,
            AuctionEvent::Revealed {
                bidder: caller.clone(),
                value,
            },
        );
        if new_leader {
            self.record(
                now,
                AuctionEvent::NewLeader {
                    bidder: caller.clone(),
                    value,
                },
            );
        }

        info!(value = %value, new_leader, "Bid revealed");
        Ok(())
    }

    /// Auction id.
    pub fn id(&self) -> AuctionId {
        self.id
    }

    /// Immutable auction parameters.
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    /// Account that holds the lot and all deposits.
    pub fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    /// Effective phase at the clock's current time.
    pub fn phase(&self) -> Phase {
        self.phases.phase_at(self.clock.now())
    }

    pub fn deadlines(&self) -> Option<Deadlines> {
        self.phases.deadlines()
    }

    /// Highest verified bid, 0 if none.
    pub fn highest_bid(&self) -> Amount {
        self.bids.highest_bid()
    }

    pub fn highest_bidder(&self) -> Option<&AccountId> {
        self.bids.highest_bidder()
    }

    /// A bidder's record.
    pub fn bidder(&self, account: &AccountId) -> Option<&BidderRecord> {
        self.registry.get(account)
    }

    /// Number of committed bidders.
    pub fn bidder_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the lot has left custody.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn proceeds_collected(&self) -> bool {
        self.proceeds_collected
    }

    /// Event log, oldest first.
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Funds the payment rail reports in custody.
    pub fn escrow_balance(&self) -> Amount {
        self.payments.balance_of(&self.custody)
    }

    /// Funds the auction still owes to bidders and the seller.
    ///
    /// Losing bidders are owed their deposit until withdrawn. The leader is
    /// owed the deposit above their bid until refunded, and the seller is
    /// owed the leading bid until collected. This always equals
    /// [`escrow_balance`](Self::escrow_balance).
    pub fn outstanding_obligations(&self) -> Amount {
        let refunds = self.registry.iter().map(|(bidder, record)| {
            if record.withdrawn {
                0
            } else if self.bids.is_leader(bidder) {
                record.excess()
            } else {
                record.deposited
            }
        });
        let proceeds = if self.proceeds_collected {
            0
        } else {
            self.bids.highest_bid()
        };

        checked_sum(refunds.chain(std::iter::once(proceeds))).unwrap_or(Amount::MAX)
    }

    /// Serializable view of the auction.
    pub fn snapshot(&self) -> AuctionSnapshot {
        let taken_at = self.clock.now();

        let mut bidders: Vec<BidderSnapshot> = self
            .registry
            .iter()
            .map(|(account, record)| BidderSnapshot {
                account: account.clone(),
                record: record.clone(),
            })
            .collect();
        bidders.sort_by(|a, b| a.account.cmp(&b.account));

        AuctionSnapshot {
            auction_id: self.id,
            taken_at,
            phase: self.phases.phase_at(taken_at),
            seller: self.config.seller.clone(),
            custody_account: self.custody.clone(),
            lot_quantity: self.config.lot_quantity,
            reserve_price: self.config.reserve_price,
            deadlines: self.phases.deadlines(),
            highest_bid: self.bids.highest_bid(),
            highest_bidder: self.bids.highest_bidder().cloned(),
            settled: self.settled,
            proceeds_collected: self.proceeds_collected,
            escrow_balance: self.escrow_balance(),
            outstanding_obligations: self.outstanding_obligations(),
            bidders,
        }
    }

    pub(crate) fn record(&mut self, at: Timestamp, event: AuctionEvent) {
        debug!(event = event.name(), "Event recorded");
        self.events.push(at, event);
    }

    pub(crate) fn refresh_escrow_gauge(&self) {
        self.metrics.set_escrow_balance(self.escrow_balance());
    }

    pub(crate) fn rejected(
        &self,
        operation: &'static str,
        caller: &AccountId,
        error: AuctionError,
    ) -> AuctionError {
        warn!(
            operation,
            caller = %caller,
            code = error.error_code(),
            error = %error,
            "Operation rejected"
        );
        self.metrics.operation_rejected();
        error
    }

    pub(crate) fn transfer_failed(
        &self,
        operation: &'static str,
        caller: &AccountId,
        error: LedgerError,
    ) -> AuctionError {
        warn!(operation, caller = %caller, error = %error, "Transfer failed");
        self.metrics.transfer_failed();
        AuctionError::TransferFailed(error.to_string())
    }
}

/// One bidder in an [`AuctionSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct BidderSnapshot {
    pub account: AccountId,
    #[serde(flatten)]
    pub record: BidderRecord,
}

/// Point-in-time view of an auction.
#[derive(Debug, Clone, Serialize)]
pub struct AuctionSnapshot {
    pub auction_id: AuctionId,
    pub taken_at: Timestamp,
    pub phase: Phase,
    pub seller: AccountId,
    pub custody_account: AccountId,
    pub lot_quantity: Amount,
    pub reserve_price: Amount,
    pub deadlines: Option<Deadlines>,
    pub highest_bid: Amount,
    pub highest_bidder: Option<AccountId>,
    pub settled: bool,
    pub proceeds_collected: bool,
    pub escrow_balance: Amount,
    pub outstanding_obligations: Amount,
    /// Sorted by account.
    pub bidders: Vec<BidderSnapshot>,
}
