//! Journal entry types for double-entry bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sealbid_common::{checked_sum, AccountId, Amount, Asset};

/// Type of journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Value leaves the account.
    Debit,
    /// Value enters the account.
    Credit,
    /// Value is created in the account from outside the ledger.
    Issue,
}

/// A single journal entry in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Transfer this entry belongs to. Both sides of a transfer share it.
    pub transfer_id: Uuid,
    /// Account affected.
    pub account_id: AccountId,
    /// Entry type.
    pub entry_type: EntryType,
    /// Amount.
    pub amount: Amount,
    /// Asset moved.
    pub asset: Asset,
    /// Account balance after this entry.
    pub balance_after: Amount,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    fn new(
        transfer_id: Uuid,
        account_id: AccountId,
        entry_type: EntryType,
        amount: Amount,
        asset: Asset,
        balance_after: Amount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transfer_id,
            account_id,
            entry_type,
            amount,
            asset,
            balance_after,
            created_at: Utc::now(),
        }
    }

    /// Create a debit entry.
    pub fn debit(
        transfer_id: Uuid,
        account_id: AccountId,
        amount: Amount,
        asset: Asset,
        balance_after: Amount,
    ) -> Self {
        Self::new(transfer_id, account_id, EntryType::Debit, amount, asset, balance_after)
    }

    /// Create a credit entry.
    pub fn credit(
        transfer_id: Uuid,
        account_id: AccountId,
        amount: Amount,
        asset: Asset,
        balance_after: Amount,
    ) -> Self {
        Self::new(transfer_id, account_id, EntryType::Credit, amount, asset, balance_after)
    }

    /// Create an issuance entry.
    pub fn issue(account_id: AccountId, amount: Amount, asset: Asset, balance_after: Amount) -> Self {
        Self::new(Uuid::new_v4(), account_id, EntryType::Issue, amount, asset, balance_after)
    }
}

/// A batch of journal entries that must be committed together.
#[derive(Debug, Clone)]
pub struct JournalBatch {
    /// Entries in the batch.
    pub entries: Vec<JournalEntry>,
}

impl JournalBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add an entry to the batch.
    pub fn add_entry(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Verify transfers are balanced (debits == credits). Issuance is excluded.
    ///
    /// A batch whose totals overflow `Amount` is never balanced.
    pub fn is_balanced(&self) -> bool {
        match (self.total_debits(), self.total_credits()) {
            (Some(debits), Some(credits)) => debits == credits,
            _ => false,
        }
    }

    /// Get total debits, or `None` on overflow.
    pub fn total_debits(&self) -> Option<Amount> {
        self.sum_of(EntryType::Debit)
    }

    /// Get total credits, or `None` on overflow.
    pub fn total_credits(&self) -> Option<Amount> {
        self.sum_of(EntryType::Credit)
    }

    /// Get total issued, or `None` on overflow.
    pub fn total_issued(&self) -> Option<Amount> {
        self.sum_of(EntryType::Issue)
    }

    fn sum_of(&self, entry_type: EntryType) -> Option<Amount> {
        checked_sum(
            self.entries
                .iter()
                .filter(|e| e.entry_type == entry_type)
                .map(|e| e.amount),
        )
    }
}

impl Default for JournalBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_batch() {
        let transfer_id = Uuid::new_v4();
        let mut batch = JournalBatch::new();

        batch.add_entry(JournalEntry::issue(AccountId::new("bidder_1"), 500, Asset::Payment, 500));
        batch.add_entry(JournalEntry::debit(
            transfer_id,
            AccountId::new("bidder_1"),
            200,
            Asset::Payment,
            300,
        ));
        batch.add_entry(JournalEntry::credit(
            transfer_id,
            AccountId::new("escrow"),
            200,
            Asset::Payment,
            200,
        ));

        assert!(batch.is_balanced());
        assert_eq!(batch.total_debits(), Some(200));
        assert_eq!(batch.total_credits(), Some(200));
        assert_eq!(batch.total_issued(), Some(500));
    }

    #[test]
    fn test_unbalanced_batch() {
        let mut batch = JournalBatch::new();
        batch.add_entry(JournalEntry::debit(
            Uuid::new_v4(),
            AccountId::new("bidder_1"),
            200,
            Asset::Payment,
            0,
        ));

        assert!(!batch.is_balanced());
    }

    #[test]
    fn test_overflowing_totals_are_not_balanced() {
        let mut batch = JournalBatch::new();
        for _ in 0..2 {
            let transfer_id = Uuid::new_v4();
            batch.add_entry(JournalEntry::debit(
                transfer_id,
                AccountId::new("whale"),
                Amount::MAX,
                Asset::Payment,
                0,
            ));
            batch.add_entry(JournalEntry::credit(
                transfer_id,
                AccountId::new("escrow"),
                Amount::MAX,
                Asset::Payment,
                Amount::MAX,
            ));
        }
        batch.add_entry(JournalEntry::issue(AccountId::new("a"), Amount::MAX, Asset::Payment, Amount::MAX));
        batch.add_entry(JournalEntry::issue(AccountId::new("b"), 1, Asset::Payment, 1));

        assert_eq!(batch.total_debits(), None);
        assert_eq!(batch.total_issued(), None);
        assert!(!batch.is_balanced());
    }
}
