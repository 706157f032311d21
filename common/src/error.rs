//! Error types for SealBid auction operations.

use crate::{AccountId, Amount, Phase};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for auction operations.
///
/// Every variant is a precondition failure reported before any state is
/// touched, except `TransferFailed`, which is returned after the call's
/// effects have been rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
    /// Caller is not the seller.
    #[error("Only the seller can perform this action: {0}")]
    NotSeller(AccountId),

    /// Caller is not the highest bidder.
    #[error("Only the highest bidder can claim the lot: {0}")]
    NotWinner(AccountId),

    /// The highest bidder must settle through the lot claim.
    #[error("The highest bidder cannot withdraw excess funds: {0}")]
    IsWinner(AccountId),

    /// The auction's own custody account cannot act as a participant.
    #[error("Custody account cannot participate in its own auction: {0}")]
    CustodyAccount(AccountId),

    /// The lot belongs to a winner and cannot go back to the seller.
    #[error("Lot has been awarded to {0}")]
    LotAwarded(AccountId),

    /// Auction has already been started.
    #[error("Auction has already started")]
    AlreadyStarted,

    /// Commitment attempted outside the bidding window.
    #[error("Bidding is not open (phase: {phase})")]
    BiddingNotOpen { phase: Phase },

    /// Reveal attempted outside the revealing window.
    #[error("Revealing is not open (phase: {phase})")]
    RevealNotOpen { phase: Phase },

    /// Settlement attempted before the auction ended.
    #[error("Auction has not ended yet (phase: {phase})")]
    NotEnded { phase: Phase },

    /// Bidder already holds a commitment.
    #[error("Bidder has already placed a bid: {0}")]
    AlreadyCommitted(AccountId),

    /// Bid already revealed.
    #[error("Bid has already been revealed: {0}")]
    AlreadyRevealed(AccountId),

    /// Excess funds already withdrawn.
    #[error("Funds already withdrawn: {0}")]
    AlreadyWithdrawn(AccountId),

    /// Lot already handed over.
    #[error("Lot already claimed")]
    AlreadyClaimed,

    /// Seller proceeds already paid out.
    #[error("Proceeds already collected")]
    AlreadyCollected,

    /// Deposit does not cover the reserve price.
    #[error("Deposit {deposit} is below the reserve price {reserve}")]
    BelowReserve { deposit: Amount, reserve: Amount },

    /// Disclosed value exceeds what was deposited.
    #[error("Bid value {value} is not payable from deposit {deposited}")]
    InsufficientDeposit { value: Amount, deposited: Amount },

    /// Disclosed value and nonce do not open the stored commitment.
    #[error("Commitment does not match disclosed value and nonce")]
    HashMismatch,

    /// Commitment digest could not be decoded.
    #[error("Invalid commitment: {0}")]
    InvalidCommitment(String),

    /// Caller never committed.
    #[error("Bidder has not placed a bid: {0}")]
    NoCommitment(AccountId),

    /// No bid was verified, so there is no winner.
    #[error("Auction has no winner")]
    NoWinner,

    /// Engine does not custody the promised lot.
    #[error("Insufficient lot funding: required {required}, available {available}")]
    InsufficientLotFunding { required: Amount, available: Amount },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// An external transfer failed and the call was rolled back.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// The auction service is no longer accepting requests.
    #[error("Auction service unavailable")]
    ServiceUnavailable,
}

/// Classification of auction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Wrong caller.
    Authorization,
    /// Operation outside its phase or time window.
    Phase,
    /// Second attempt at a one-shot action.
    DuplicateAction,
    /// Bad bid value, deposit, or commitment opening.
    Value,
    /// Missing record.
    NotFound,
    /// Lot custody not in place.
    Funding,
    /// Invalid engine parameters.
    Configuration,
    /// External collaborator failure.
    Transfer,
    /// Hosting service failure.
    Service,
}

impl AuctionError {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuctionError::NotSeller(_)
            | AuctionError::NotWinner(_)
            | AuctionError::IsWinner(_)
            | AuctionError::LotAwarded(_)
            | AuctionError::CustodyAccount(_) => ErrorCategory::Authorization,
            AuctionError::AlreadyStarted
            | AuctionError::BiddingNotOpen { .. }
            | AuctionError::RevealNotOpen { .. }
            | AuctionError::NotEnded { .. } => ErrorCategory::Phase,
            AuctionError::AlreadyCommitted(_)
            | AuctionError::AlreadyRevealed(_)
            | AuctionError::AlreadyWithdrawn(_)
            | AuctionError::AlreadyClaimed
            | AuctionError::AlreadyCollected => ErrorCategory::DuplicateAction,
            AuctionError::BelowReserve { .. }
            | AuctionError::InsufficientDeposit { .. }
            | AuctionError::HashMismatch
            | AuctionError::InvalidCommitment(_) => ErrorCategory::Value,
            AuctionError::NoCommitment(_) | AuctionError::NoWinner => ErrorCategory::NotFound,
            AuctionError::InsufficientLotFunding { .. } => ErrorCategory::Funding,
            AuctionError::InvalidConfig(_) => ErrorCategory::Configuration,
            AuctionError::TransferFailed(_) => ErrorCategory::Transfer,
            AuctionError::ServiceUnavailable => ErrorCategory::Service,
        }
    }

    /// Check if the same call could succeed later without changing its input.
    ///
    /// Phase errors clear as the clock advances and transfer failures may be
    /// transient; everything else needs a different call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuctionError::BiddingNotOpen { phase: Phase::Created }
                | AuctionError::RevealNotOpen {
                    phase: Phase::Created | Phase::Bidding
                }
                | AuctionError::NotEnded { .. }
                | AuctionError::TransferFailed(_)
        )
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuctionError::NotSeller(_) => "NOT_SELLER",
            AuctionError::NotWinner(_) => "NOT_WINNER",
            AuctionError::IsWinner(_) => "IS_WINNER",
            AuctionError::LotAwarded(_) => "LOT_AWARDED",
            AuctionError::CustodyAccount(_) => "CUSTODY_ACCOUNT",
            AuctionError::AlreadyStarted => "ALREADY_STARTED",
            AuctionError::BiddingNotOpen { .. } => "BIDDING_NOT_OPEN",
            AuctionError::RevealNotOpen { .. } => "REVEAL_NOT_OPEN",
            AuctionError::NotEnded { .. } => "NOT_ENDED",
            AuctionError::AlreadyCommitted(_) => "ALREADY_COMMITTED",
            AuctionError::AlreadyRevealed(_) => "ALREADY_REVEALED",
            AuctionError::AlreadyWithdrawn(_) => "ALREADY_WITHDRAWN",
            AuctionError::AlreadyClaimed => "ALREADY_CLAIMED",
            AuctionError::AlreadyCollected => "ALREADY_COLLECTED",
            AuctionError::BelowReserve { .. } => "BELOW_RESERVE",
            AuctionError::InsufficientDeposit { .. } => "INSUFFICIENT_DEPOSIT",
            AuctionError::HashMismatch => "HASH_MISMATCH",
            AuctionError::InvalidCommitment(_) => "INVALID_COMMITMENT",
            AuctionError::NoCommitment(_) => "NO_COMMITMENT",
            AuctionError::NoWinner => "NO_WINNER",
            AuctionError::InsufficientLotFunding { .. } => "INSUFFICIENT_LOT_FUNDING",
            AuctionError::InvalidConfig(_) => "INVALID_CONFIG",
            AuctionError::TransferFailed(_) => "TRANSFER_FAILED",
            AuctionError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

/// Result type alias for auction operations.
pub type Result<T> = std::result::Result<T, AuctionError>;
