//! Interfaces to the external collaborators that hold auction value.

use thiserror::Error;

use sealbid_common::{AccountId, Amount, Asset};

/// Errors raised by a ledger or payment transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Source account cannot cover the transfer.
    #[error("Insufficient {asset} balance in {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        asset: Asset,
        required: Amount,
        available: Amount,
    },

    /// Crediting the destination would overflow its balance.
    #[error("Balance overflow in {0}")]
    Overflow(AccountId),

    /// The transport refused the transfer.
    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Fungible-token ledger holding the lot.
pub trait AssetLedger: Send + Sync {
    /// Current balance of `account`.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Move `amount` from `from` to `to`. Either fully applies or fails.
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> LedgerResult<()>;
}

/// Payment transport that carries bid deposits in and refunds out.
pub trait PaymentRail: Send + Sync {
    /// Take an inbound payment from `payer` into `escrow`.
    fn collect(&self, payer: &AccountId, escrow: &AccountId, amount: Amount) -> LedgerResult<()>;

    /// Pay `amount` out of `escrow` to `payee`.
    fn pay(&self, escrow: &AccountId, payee: &AccountId, amount: Amount) -> LedgerResult<()>;

    /// Funds currently held by `account`.
    fn balance_of(&self, account: &AccountId) -> Amount;
}
