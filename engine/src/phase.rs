//! Phase controller: lifecycle clock and phase boundaries.

use chrono::Duration;
use serde::Serialize;

use sealbid_common::{AuctionError, DurationExt, Phase, Result, Timestamp};

/// Absolute deadlines fixed when bidding opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deadlines {
    /// First instant at which commitments are refused.
    pub bidding: Timestamp,
    /// First instant at which reveals are refused.
    pub revealing: Timestamp,
}

/// Tracks the stored phase and derives the effective one from the clock.
///
/// The only stored transition is `Created -> Bidding`; `Revealing` and `Ended`
/// are read off the deadlines, so no call is needed to advance them.
#[derive(Debug, Clone)]
pub struct PhaseController {
    bidding_window: Duration,
    revealing_window: Duration,
    deadlines: Option<Deadlines>,
}

impl PhaseController {
    /// Create a controller in `Created`.
    pub fn new(
        bidding_window: std::time::Duration,
        revealing_window: std::time::Duration,
    ) -> Result<Self> {
        let bidding_window = bidding_window
            .to_chrono()
            .ok_or_else(|| AuctionError::InvalidConfig("Bidding window too large".to_string()))?;
        let revealing_window = revealing_window
            .to_chrono()
            .ok_or_else(|| AuctionError::InvalidConfig("Revealing window too large".to_string()))?;

        Ok(Self {
            bidding_window,
            revealing_window,
            deadlines: None,
        })
    }

    /// Effective phase at `now`.
    pub fn phase_at(&self, now: Timestamp) -> Phase {
        match self.deadlines {
            None => Phase::Created,
            Some(d) if now < d.bidding => Phase::Bidding,
            Some(d) if now < d.revealing => Phase::Revealing,
            Some(_) => Phase::Ended,
        }
    }

    /// Deadlines, once bidding has opened.
    pub fn deadlines(&self) -> Option<Deadlines> {
        self.deadlines
    }

    /// Compute the deadlines bidding would get if it opened at `now`.
    ///
    /// Does not mutate; callers apply the result with [`open`](Self::open)
    /// once every other precondition has passed.
    pub fn plan_start(&self, now: Timestamp) -> Result<Deadlines> {
        if !self.phase_at(now).can_advance_to(Phase::Bidding) {
            return Err(AuctionError::AlreadyStarted);
        }

        let bidding = now
            .checked_add_signed(self.bidding_window)
            .ok_or_else(|| AuctionError::InvalidConfig("Bidding deadline out of range".to_string()))?;
        let revealing = bidding
            .checked_add_signed(self.revealing_window)
            .ok_or_else(|| {
                AuctionError::InvalidConfig("Revealing deadline out of range".to_string())
            })?;

        Ok(Deadlines { bidding, revealing })
    }

    /// Store the `Created -> Bidding` transition.
    pub fn open(&mut self, deadlines: Deadlines) {
        debug_assert!(self.deadlines.is_none());
        self.deadlines = Some(deadlines);
    }

    /// Require the effective phase at `now` to be `required`.
    pub fn require(&self, now: Timestamp, required: Phase) -> Result<()> {
        let phase = self.phase_at(now);
        if phase == required {
            return Ok(());
        }

        Err(match required {
            Phase::Created => AuctionError::AlreadyStarted,
            Phase::Bidding => AuctionError::BiddingNotOpen { phase },
            Phase::Revealing => AuctionError::RevealNotOpen { phase },
            Phase::Ended => AuctionError::NotEnded { phase },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbid_common::now;

    fn controller() -> PhaseController {
        PhaseController::new(
            std::time::Duration::from_secs(120),
            std::time::Duration::from_secs(120),
        )
        .unwrap()
    }

    #[test]
    fn test_created_until_opened() {
        let controller = controller();
        let t = now();
        assert_eq!(controller.phase_at(t), Phase::Created);
        assert_eq!(controller.phase_at(t + Duration::days(365)), Phase::Created);
        assert!(controller.deadlines().is_none());
    }

    #[test]
    fn test_phase_boundaries_are_half_open() {
        let mut controller = controller();
        let t0 = now();
        let deadlines = controller.plan_start(t0).unwrap();
        controller.open(deadlines);

        assert_eq!(deadlines.bidding, t0 + Duration::seconds(120));
        assert_eq!(deadlines.revealing, t0 + Duration::seconds(240));

        assert_eq!(controller.phase_at(t0), Phase::Bidding);
        assert_eq!(
            controller.phase_at(deadlines.bidding - Duration::nanoseconds(1)),
            Phase::Bidding
        );
        assert_eq!(controller.phase_at(deadlines.bidding), Phase::Revealing);
        assert_eq!(
            controller.phase_at(deadlines.revealing - Duration::nanoseconds(1)),
            Phase::Revealing
        );
        assert_eq!(controller.phase_at(deadlines.revealing), Phase::Ended);
    }

    #[test]
    fn test_cannot_open_twice() {
        let mut controller = controller();
        let t0 = now();
        let deadlines = controller.plan_start(t0).unwrap();
        controller.open(deadlines);

        assert_eq!(controller.plan_start(t0), Err(AuctionError::AlreadyStarted));
        assert_eq!(
            controller.plan_start(deadlines.revealing + Duration::days(1)),
            Err(AuctionError::AlreadyStarted)
        );
    }

    #[test]
    fn test_require_maps_to_phase_errors() {
        let mut controller = controller();
        let t0 = now();

        assert_eq!(
            controller.require(t0, Phase::Bidding),
            Err(AuctionError::BiddingNotOpen {
                phase: Phase::Created
            })
        );

        let deadlines = controller.plan_start(t0).unwrap();
        controller.open(deadlines);

        assert!(controller.require(t0, Phase::Bidding).is_ok());
        assert_eq!(
            controller.require(t0, Phase::Revealing),
            Err(AuctionError::RevealNotOpen {
                phase: Phase::Bidding
            })
        );
        assert_eq!(
            controller.require(deadlines.bidding, Phase::Ended),
            Err(AuctionError::NotEnded {
                phase: Phase::Revealing
            })
        );
        assert!(controller.require(deadlines.revealing, Phase::Ended).is_ok());
    }
}
