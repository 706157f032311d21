//! Monetary types for SealBid.
//!
//! Every value the engine handles is an integer count of the smallest unit of
//! its asset, so there is no rounding anywhere in the accounting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer amount of either asset.
pub type Amount = u128;

/// The two assets an auction moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Asset {
    /// The fungible token being sold.
    Lot,
    /// The value bidders deposit and are refunded in.
    Payment,
}

impl Asset {
    /// Short code used in journals and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Asset::Lot => "LOT",
            Asset::Payment => "PAY",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Sum amounts, returning `None` on overflow.
pub fn checked_sum<I>(amounts: I) -> Option<Amount>
where
    I: IntoIterator<Item = Amount>,
{
    amounts
        .into_iter()
        .try_fold(0 as Amount, |acc, amount| acc.checked_add(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sum() {
        assert_eq!(checked_sum([100, 200, 250]), Some(550));
        assert_eq!(checked_sum(Vec::<Amount>::new()), Some(0));
        assert_eq!(checked_sum([Amount::MAX, 1]), None);
    }

    #[test]
    fn test_asset_codes() {
        assert_eq!(Asset::Lot.to_string(), "LOT");
        assert_eq!(Asset::Payment.to_string(), "PAY");
        assert_eq!(serde_json::to_string(&Asset::Payment).unwrap(), "\"PAYMENT\"");
    }
}
