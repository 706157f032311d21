//! In-memory double-entry ledger.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use sealbid_common::{checked_sum, AccountId, Amount, Asset};

use crate::custody::{AssetLedger, LedgerError, LedgerResult, PaymentRail};
use crate::journal::{JournalBatch, JournalEntry};

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<AccountId, Amount>,
    journal: JournalBatch,
}

/// Single-asset ledger keeping balances and a journal of every movement.
///
/// Serves as the token ledger for the lot and as the payment rail for
/// deposits, depending on the asset it is created for.
#[derive(Debug)]
pub struct LedgerEngine {
    asset: Asset,
    state: Mutex<LedgerState>,
}

impl LedgerEngine {
    /// Create an empty ledger for `asset`.
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Create `amount` of the asset in `account`.
    #[instrument(skip(self), fields(asset = %self.asset))]
    pub fn issue(&self, account: &AccountId, amount: Amount) -> LedgerResult<()> {
        let mut state = self.state.lock();
        let balance = state.balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
        let balance_after = *balance;

        state
            .journal
            .add_entry(JournalEntry::issue(account.clone(), amount, self.asset, balance_after));

        info!(account = %account, amount = %amount, "Issued funds");
        Ok(())
    }

    /// Current balance of `account`.
    pub fn balance(&self, account: &AccountId) -> Amount {
        self.state.lock().balances.get(account).copied().unwrap_or(0)
    }

    /// Move `amount` between accounts, recording a debit and a credit.
    pub fn move_funds(&self, from: &AccountId, to: &AccountId, amount: Amount) -> LedgerResult<()> {
        let mut state = self.state.lock();

        let available = state.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            warn!(
                asset = %self.asset,
                from = %from,
                required = %amount,
                available = %available,
                "Transfer rejected for insufficient balance"
            );
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                asset: self.asset,
                required: amount,
                available,
            });
        }

        let (from_after, to_after) = if from == to {
            (available, available)
        } else {
            let to_balance = state.balances.get(to).copied().unwrap_or(0);
            let to_after = to_balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
            (available - amount, to_after)
        };

        // All checks passed; apply both sides.
        state.balances.insert(from.clone(), from_after);
        state.balances.insert(to.clone(), to_after);

        let transfer_id = Uuid::new_v4();
        state.journal.add_entry(JournalEntry::debit(
            transfer_id,
            from.clone(),
            amount,
            self.asset,
            from_after,
        ));
        state.journal.add_entry(JournalEntry::credit(
            transfer_id,
            to.clone(),
            amount,
            self.asset,
            to_after,
        ));

        debug!(
            asset = %self.asset,
            from = %from,
            to = %to,
            amount = %amount,
            "Funds moved"
        );
        Ok(())
    }

    /// Get a copy of all journal entries.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.entries.clone()
    }

    /// Verify ledger integrity: debits equal credits and the sum of balances
    /// equals everything ever issued.
    pub fn verify_integrity(&self) -> bool {
        let state = self.state.lock();
        let total = checked_sum(state.balances.values().copied());
        state.journal.is_balanced() && total.is_some() && total == state.journal.total_issued()
    }
}

impl AssetLedger for LedgerEngine {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balance(account)
    }

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> LedgerResult<()> {
        self.move_funds(from, to, amount)
    }
}

impl PaymentRail for LedgerEngine {
    fn collect(&self, payer: &AccountId, escrow: &AccountId, amount: Amount) -> LedgerResult<()> {
        self.move_funds(payer, escrow, amount)
    }

    fn pay(&self, escrow: &AccountId, payee: &AccountId, amount: Amount) -> LedgerResult<()> {
        self.move_funds(escrow, payee, amount)
    }

    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balance(account)
    }
}
