//! Settlement: lot hand-over, refunds and seller proceeds.
//!
//! Every operation here flips its one-shot flag before the outbound transfer
//! and clears it again if the transfer fails.

use serde::Serialize;
use tracing::{info, instrument, warn};

use sealbid_common::{AccountId, Amount, AuctionError, Phase, Result, Timestamp};
use sealbid_ledger::{AssetLedger, PaymentRail};

use crate::auction::AuctionEngine;
use crate::events::AuctionEvent;

/// Outcome of a successful [`AuctionEngine::claim_lot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    /// Lot tokens handed to the winner.
    pub lot_quantity: Amount,
    /// Deposit above the winning bid paid back with the lot.
    pub excess_refund: Amount,
    /// Excess the rail failed to pay; recoverable through
    /// [`AuctionEngine::withdraw_excess`].
    pub excess_pending: Amount,
}

impl AuctionEngine {
    /// Hand the lot to the winner and refund their deposit above the bid.
    ///
    /// The winning bid stays in custody for the seller. If the lot transfer
    /// fails nothing changes. If only the excess refund fails the claim still
    /// stands and the excess remains withdrawable.
    #[instrument(skip(self), fields(auction_id = %self.id))]
    pub fn claim_lot(&mut self, caller: &AccountId) -> Result<ClaimReceipt> {
        let now = self.clock.now();

        let excess = self
            .check_claim(caller, now)
            .map_err(|e| self.rejected("claim_lot", caller, e))?;

        self.settled = true;
        self.registry.set_withdrawn(caller, true);

        if let Err(e) = self
            .lot
            .transfer(&self.custody, caller, self.config.lot_quantity)
        {
            self.settled = false;
            self.registry.set_withdrawn(caller, false);
            return Err(self.transfer_failed("claim_lot", caller, e));
        }
        self.metrics.lot_settled();

        let mut receipt = ClaimReceipt {
            lot_quantity: self.config.lot_quantity,
            excess_refund: excess,
            excess_pending: 0,
        };

        if excess > 0 {
            if let Err(e) = self.payments.pay(&self.custody, caller, excess) {
                self.registry.set_withdrawn(caller, false);
                let error = self.transfer_failed("claim_lot", caller, e);
                warn!(excess = %excess, error = %error, "Excess refund left pending");
                receipt.excess_refund = 0;
                receipt.excess_pending = excess;
            }
        }

        self.refresh_escrow_gauge();
        self.record(
            now,
            AuctionEvent::LotClaimed {
                winner: caller.clone(),
                lot_quantity: receipt.lot_quantity,
                excess_refund: receipt.excess_refund,
            },
        );

        info!(
            lot_quantity = %receipt.lot_quantity,
            excess_refund = %receipt.excess_refund,
            "Lot claimed"
        );
        Ok(receipt)
    }

    fn check_claim(&self, caller: &AccountId, now: Timestamp) -> Result<Amount> {
        self.phases.require(now, Phase::Ended)?;

        if !self.bids.is_leader(caller) {
            return Err(AuctionError::NotWinner(caller.clone()));
        }

        if self.settled {
            return Err(AuctionError::AlreadyClaimed);
        }

        let record = self
            .registry
            .get(caller)
            .ok_or_else(|| AuctionError::NoCommitment(caller.clone()))?;
        Ok(record.excess())
    }

    /// Refund a bidder after the auction ended.
    ///
    /// Losing bidders get their whole deposit back, revealed or not. The
    /// winner uses this only to recover an excess refund the claim could not
    /// pay. Returns the amount paid.
    #[instrument(skip(self), fields(auction_id = %self.id))]
    pub fn withdraw_excess(&mut self, caller: &AccountId) -> Result<Amount> {
        let now = self.clock.now();

        let refund = self
            .check_withdraw(caller, now)
            .map_err(|e| self.rejected("withdraw_excess", caller, e))?;

        self.registry.set_withdrawn(caller, true);

        if refund > 0 {
            if let Err(e) = self.payments.pay(&self.custody, caller, refund) {
                self.registry.set_withdrawn(caller, false);
                return Err(self.transfer_failed("withdraw_excess", caller, e));
            }
        }

        self.metrics.withdrawal_paid();
        self.refresh_escrow_gauge();
        self.record(
            now,
            AuctionEvent::Withdrawn {
                bidder: caller.clone(),
                amount: refund,
            },
        );

        info!(refund = %refund, "Deposit withdrawn");
        Ok(refund)
    }

    fn check_withdraw(&self, caller: &AccountId, now: Timestamp) -> Result<Amount> {
        self.phases.require(now, Phase::Ended)?;

        let is_winner = self.bids.is_leader(caller);
        if is_winner && !self.settled {
            return Err(AuctionError::IsWinner(caller.clone()));
        }

        let record = self
            .registry
            .get(caller)
            .ok_or_else(|| AuctionError::NoCommitment(caller.clone()))?;

        if record.withdrawn {
            return Err(AuctionError::AlreadyWithdrawn(caller.clone()));
        }

        Ok(if is_winner {
            record.excess()
        } else {
            record.deposited
        })
    }

    /// Pay the winning bid to the seller. Returns the amount paid.
    #[instrument(skip(self), fields(auction_id = %self.id))]
    pub fn collect_proceeds(&mut self, caller: &AccountId) -> Result<Amount> {
        let now = self.clock.now();

        let amount = self
            .check_collect(caller, now)
            .map_err(|e| self.rejected("collect_proceeds", caller, e))?;

        self.proceeds_collected = true;

        if let Err(e) = self.payments.pay(&self.custody, caller, amount) {
            self.proceeds_collected = false;
            return Err(self.transfer_failed("collect_proceeds", caller, e));
        }

        self.metrics.proceeds_paid();
        self.refresh_escrow_gauge();
        self.record(
            now,
            AuctionEvent::ProceedsCollected {
                seller: caller.clone(),
                amount,
            },
        );

        info!(amount = %amount, "Proceeds collected");
        Ok(amount)
    }

    fn check_collect(&self, caller: &AccountId, now: Timestamp) -> Result<Amount> {
        self.phases.require(now, Phase::Ended)?;

        if *caller != self.config.seller {
            return Err(AuctionError::NotSeller(caller.clone()));
        }

        if self.bids.leader().is_none() {
            return Err(AuctionError::NoWinner);
        }

        if self.proceeds_collected {
            return Err(AuctionError::AlreadyCollected);
        }

        Ok(self.bids.highest_bid())
    }

    /// Return an unsold lot to the seller. Returns the quantity moved.
    #[instrument(skip(self), fields(auction_id = %self.id))]
    pub fn reclaim_lot(&mut self, caller: &AccountId) -> Result<Amount> {
        let now = self.clock.now();

        self.check_reclaim(caller, now)
            .map_err(|e| self.rejected("reclaim_lot", caller, e))?;

        self.settled = true;

        let quantity = self.config.lot_quantity;
        if let Err(e) = self.lot.transfer(&self.custody, caller, quantity) {
            self.settled = false;
            return Err(self.transfer_failed("reclaim_lot", caller, e));
        }

        self.metrics.lot_settled();
        self.record(
            now,
            AuctionEvent::LotReclaimed {
                seller: caller.clone(),
                lot_quantity: quantity,
            },
        );

        info!(lot_quantity = %quantity, "Unsold lot reclaimed");
        Ok(quantity)
    }

    fn check_reclaim(&self, caller: &AccountId, now: Timestamp) -> Result<()> {
        self.phases.require(now, Phase::Ended)?;

        if *caller != self.config.seller {
            return Err(AuctionError::NotSeller(caller.clone()));
        }

        if let Some(winner) = self.bids.highest_bidder() {
            return Err(AuctionError::LotAwarded(winner.clone()));
        }

        if self.settled {
            return Err(AuctionError::AlreadyClaimed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use chrono::Duration;

    use sealbid_common::{Asset, ManualClock};
    use sealbid_crypto::SealedBid;
    use sealbid_ledger::{LedgerEngine, LedgerError, LedgerResult};

    use super::*;
    use crate::config::AuctionConfig;

    /// Payment rail whose outbound payments can be switched off.
    struct FlakyRail {
        inner: LedgerEngine,
        fail_payouts: AtomicBool,
    }

    impl FlakyRail {
        fn new() -> Self {
            Self {
                inner: LedgerEngine::new(Asset::Payment),
                fail_payouts: AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.fail_payouts.store(failing, Ordering::SeqCst);
        }
    }

    impl PaymentRail for FlakyRail {
        fn collect(&self, payer: &AccountId, escrow: &AccountId, amount: Amount) -> LedgerResult<()> {
            self.inner.move_funds(payer, escrow, amount)
        }

        fn pay(&self, escrow: &AccountId, payee: &AccountId, amount: Amount) -> LedgerResult<()> {
            if self.fail_payouts.load(Ordering::SeqCst) {
                return Err(LedgerError::Rejected("rail offline".to_string()));
            }
            self.inner.move_funds(escrow, payee, amount)
        }

        fn balance_of(&self, account: &AccountId) -> Amount {
            self.inner.balance(account)
        }
    }

    struct Harness {
        engine: AuctionEngine,
        clock: ManualClock,
        tokens: Arc<LedgerEngine>,
        rail: Arc<FlakyRail>,
    }

    fn seller() -> AccountId {
        AccountId::new("seller")
    }

    fn harness() -> Harness {
        let clock = ManualClock::default();
        let tokens = Arc::new(LedgerEngine::new(Asset::Lot));
        let rail = Arc::new(FlakyRail::new());

        let mut engine = AuctionEngine::new(
            AuctionConfig::default(),
            tokens.clone(),
            rail.clone(),
            Arc::new(clock.clone()),
        )
        .unwrap();

        tokens.issue(engine.custody_account(), 1000).unwrap();
        engine.start(&seller()).unwrap();

        Harness {
            engine,
            clock,
            tokens,
            rail,
        }
    }

    /// Commit and, if `reveal`, disclose a bid for a freshly funded bidder.
    fn bid(h: &mut Harness, name: &str, value: Amount, deposit: Amount) -> (AccountId, SealedBid) {
        let account = AccountId::new(name);
        h.rail.inner.issue(&account, deposit).unwrap();
        let sealed = SealedBid::new(value);
        h.engine.commit(&account, sealed.commitment, deposit).unwrap();
        (account, sealed)
    }

    fn to_revealing(h: &Harness) {
        h.clock.advance(Duration::seconds(120));
    }

    fn to_ended(h: &Harness) {
        h.clock.advance(Duration::seconds(120));
    }

    #[test]
    fn test_claim_requires_end_and_winner() {
        let mut h = harness();
        let (alice, alice_bid) = bid(&mut h, "alice", 150, 200);
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);

        to_revealing(&h);
        h.engine.reveal(&alice, 150, &alice_bid.nonce).unwrap();
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();

        assert_eq!(
            h.engine.claim_lot(&bob),
            Err(AuctionError::NotEnded {
                phase: Phase::Revealing
            })
        );

        to_ended(&h);
        assert_eq!(
            h.engine.claim_lot(&alice),
            Err(AuctionError::NotWinner(alice.clone()))
        );

        let receipt = h.engine.claim_lot(&bob).unwrap();
        assert_eq!(receipt.lot_quantity, 1000);
        assert_eq!(receipt.excess_refund, 20);
        assert_eq!(h.tokens.balance(&bob), 1000);
        assert_eq!(h.rail.inner.balance(&bob), 20);

        assert_eq!(h.engine.claim_lot(&bob), Err(AuctionError::AlreadyClaimed));
        assert_eq!(h.tokens.balance(&bob), 1000);
    }

    #[test]
    fn test_winner_cannot_withdraw_before_claim() {
        let mut h = harness();
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);

        to_revealing(&h);
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();
        to_ended(&h);

        assert_eq!(
            h.engine.withdraw_excess(&bob),
            Err(AuctionError::IsWinner(bob.clone()))
        );

        h.engine.claim_lot(&bob).unwrap();
        assert_eq!(
            h.engine.withdraw_excess(&bob),
            Err(AuctionError::AlreadyWithdrawn(bob.clone()))
        );
    }

    #[test]
    fn test_losers_and_silent_bidders_get_full_deposit() {
        let mut h = harness();
        let (alice, alice_bid) = bid(&mut h, "alice", 150, 200);
        let (carol, _) = bid(&mut h, "carol", 170, 300);
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);

        to_revealing(&h);
        h.engine.reveal(&alice, 150, &alice_bid.nonce).unwrap();
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();

        assert_eq!(
            h.engine.withdraw_excess(&alice),
            Err(AuctionError::NotEnded {
                phase: Phase::Revealing
            })
        );

        to_ended(&h);
        assert_eq!(h.engine.withdraw_excess(&alice), Ok(200));
        assert_eq!(h.engine.withdraw_excess(&carol), Ok(300));
        assert_eq!(
            h.engine.withdraw_excess(&alice),
            Err(AuctionError::AlreadyWithdrawn(alice.clone()))
        );

        let stranger = AccountId::new("stranger");
        assert_eq!(
            h.engine.withdraw_excess(&stranger),
            Err(AuctionError::NoCommitment(stranger))
        );
        assert_eq!(h.engine.escrow_balance(), 200);
        assert_eq!(h.engine.outstanding_obligations(), 200);
    }

    #[test]
    fn test_failed_refund_rolls_back() {
        let mut h = harness();
        let (alice, alice_bid) = bid(&mut h, "alice", 150, 200);
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);

        to_revealing(&h);
        h.engine.reveal(&alice, 150, &alice_bid.nonce).unwrap();
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();
        to_ended(&h);

        h.rail.set_failing(true);
        assert!(matches!(
            h.engine.withdraw_excess(&alice),
            Err(AuctionError::TransferFailed(_))
        ));
        assert!(!h.engine.bidder(&alice).unwrap().withdrawn);
        assert_eq!(h.engine.escrow_balance(), h.engine.outstanding_obligations());

        h.rail.set_failing(false);
        assert_eq!(h.engine.withdraw_excess(&alice), Ok(200));
    }

    #[test]
    fn test_claim_with_failed_excess_keeps_excess_withdrawable() {
        let mut h = harness();
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);

        to_revealing(&h);
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();
        to_ended(&h);

        h.rail.set_failing(true);
        let receipt = h.engine.claim_lot(&bob).unwrap();
        assert_eq!(receipt.excess_refund, 0);
        assert_eq!(receipt.excess_pending, 20);
        assert!(h.engine.is_settled());
        assert_eq!(h.tokens.balance(&bob), 1000);
        assert_eq!(h.engine.outstanding_obligations(), 200);
        assert_eq!(h.engine.escrow_balance(), 200);

        h.rail.set_failing(false);
        assert_eq!(h.engine.withdraw_excess(&bob), Ok(20));
        assert_eq!(h.engine.escrow_balance(), 180);
        assert_eq!(h.engine.outstanding_obligations(), 180);
    }

    #[test]
    fn test_proceeds_paid_once() {
        let mut h = harness();
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);

        assert_eq!(
            h.engine.collect_proceeds(&seller()),
            Err(AuctionError::NotEnded {
                phase: Phase::Bidding
            })
        );

        to_revealing(&h);
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();
        to_ended(&h);

        assert_eq!(
            h.engine.collect_proceeds(&bob),
            Err(AuctionError::NotSeller(bob.clone()))
        );

        h.rail.set_failing(true);
        assert!(h.engine.collect_proceeds(&seller()).is_err());
        assert!(!h.engine.proceeds_collected());

        h.rail.set_failing(false);
        assert_eq!(h.engine.collect_proceeds(&seller()), Ok(180));
        assert_eq!(
            h.engine.collect_proceeds(&seller()),
            Err(AuctionError::AlreadyCollected)
        );

        h.engine.claim_lot(&bob).unwrap();
        assert_eq!(h.engine.escrow_balance(), 0);
        assert_eq!(h.engine.outstanding_obligations(), 0);
    }

    #[test]
    fn test_reclaim_only_without_winner() {
        let mut h = harness();
        let (silent, _) = bid(&mut h, "silent", 150, 200);
        to_revealing(&h);
        to_ended(&h);

        assert_eq!(
            h.engine.collect_proceeds(&seller()),
            Err(AuctionError::NoWinner)
        );
        assert_eq!(
            h.engine.reclaim_lot(&silent),
            Err(AuctionError::NotSeller(silent.clone()))
        );

        assert_eq!(h.engine.reclaim_lot(&seller()), Ok(1000));
        assert_eq!(h.tokens.balance(&seller()), 1000);
        assert_eq!(
            h.engine.reclaim_lot(&seller()),
            Err(AuctionError::AlreadyClaimed)
        );
        assert_eq!(h.engine.withdraw_excess(&silent), Ok(200));
    }

    #[test]
    fn test_reclaim_refused_when_lot_awarded() {
        let mut h = harness();
        let (bob, bob_bid) = bid(&mut h, "bob", 180, 200);
        to_revealing(&h);
        h.engine.reveal(&bob, 180, &bob_bid.nonce).unwrap();
        to_ended(&h);

        assert_eq!(
            h.engine.reclaim_lot(&seller()),
            Err(AuctionError::LotAwarded(bob))
        );
    }

    #[test]
    fn test_lot_ledger_failure_leaves_claim_open() {
        struct FrozenLedger;

        impl AssetLedger for FrozenLedger {
            fn balance_of(&self, _account: &AccountId) -> Amount {
                1000
            }

            fn transfer(&self, _from: &AccountId, _to: &AccountId, _amount: Amount) -> LedgerResult<()> {
                Err(LedgerError::Rejected("frozen".to_string()))
            }
        }

        let clock = ManualClock::default();
        let rail = Arc::new(FlakyRail::new());
        let mut engine = AuctionEngine::new(
            AuctionConfig::default(),
            Arc::new(FrozenLedger),
            rail.clone(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        engine.start(&seller()).unwrap();

        let bob = AccountId::new("bob");
        rail.inner.issue(&bob, 200).unwrap();
        let sealed = SealedBid::new(180);
        engine.commit(&bob, sealed.commitment, 200).unwrap();
        clock.advance(Duration::seconds(120));
        engine.reveal(&bob, 180, &sealed.nonce).unwrap();
        clock.advance(Duration::seconds(120));

        assert!(matches!(
            engine.claim_lot(&bob),
            Err(AuctionError::TransferFailed(_))
        ));
        assert!(!engine.is_settled());
        assert!(!engine.bidder(&bob).unwrap().withdrawn);
        assert_eq!(engine.escrow_balance(), 200);
    }
}
