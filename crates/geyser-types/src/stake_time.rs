//! Stake-time accumulator.
//!
//! Both the pool-wide total and every vault position track the integral of
//! staked amount over time with the same lazy rule, applied immediately
//! before the stake changes:
//!
//! ```text
//! accumulated' = accumulated + stake * (now - last_update)
//! last_update' = now
//! ```
//!
//! The integral is exact in integer arithmetic, so splitting an interval into
//! any number of advances yields the same value as a single advance.

use serde::{Deserialize, Serialize};

/// Errors raised while accruing stake-time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccrualError {
    /// The observation time precedes the last update.
    #[error("time moved backwards: last update {last_update}, now {now}")]
    TimeReversed {
        /// Timestamp of the last advance.
        last_update: u64,
        /// The rejected observation time.
        now: u64,
    },

    /// The accumulator overflowed.
    #[error("stake-time overflow")]
    Overflow,

    /// More stake-time was removed than had accrued.
    #[error("stake-time underflow: have {available}, remove {requested}")]
    Underflow {
        /// Accrued stake-time.
        available: u128,
        /// Stake-time requested for removal.
        requested: u128,
    },
}

/// Lazily advanced integral of stake over time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeTime {
    /// Accrued stake-seconds as of `last_update`.
    pub accumulated: u128,
    /// Timestamp of the last advance.
    pub last_update: u64,
}

impl StakeTime {
    /// An empty accumulator starting at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            accumulated: 0,
            last_update: now,
        }
    }

    /// Value of the accumulator at `now` if `stake` has been constant since
    /// the last update. Does not mutate.
    pub fn at(&self, stake: u128, now: u64) -> Result<u128, AccrualError> {
        let elapsed = now
            .checked_sub(self.last_update)
            .ok_or(AccrualError::TimeReversed {
                last_update: self.last_update,
                now,
            })?;
        let accrued = stake
            .checked_mul(u128::from(elapsed))
            .ok_or(AccrualError::Overflow)?;
        self.accumulated
            .checked_add(accrued)
            .ok_or(AccrualError::Overflow)
    }

    /// Pure advance: returns the accumulator moved forward to `now`.
    pub fn advance(self, stake: u128, now: u64) -> Result<Self, AccrualError> {
        Ok(Self {
            accumulated: self.at(stake, now)?,
            last_update: now,
        })
    }

    /// Remove consumed stake-time, e.g. the units settled by a withdrawal.
    pub fn remove(&mut self, units: u128) -> Result<(), AccrualError> {
        self.accumulated =
            self.accumulated
                .checked_sub(units)
                .ok_or(AccrualError::Underflow {
                    available: self.accumulated,
                    requested: units,
                })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accrues_stake_times_elapsed() {
        let acc = StakeTime::new(1_000).advance(50, 1_010).expect("advance");
        assert_eq!(acc.accumulated, 500);
        assert_eq!(acc.last_update, 1_010);
    }

    #[test]
    fn test_split_advances_match_single_advance() {
        let single = StakeTime::new(0).advance(7, 1_000).expect("single");
        let mut split = StakeTime::new(0);
        for t in [1, 3, 250, 251, 999, 1_000] {
            split = split.advance(7, t).expect("split");
        }
        assert_eq!(single, split);
    }

    #[test]
    fn test_at_does_not_mutate() {
        let acc = StakeTime::new(100);
        assert_eq!(acc.at(10, 200).expect("at"), 1_000);
        assert_eq!(acc.accumulated, 0);
        assert_eq!(acc.last_update, 100);
    }

    #[test]
    fn test_zero_stake_accrues_nothing() {
        let acc = StakeTime::new(0).advance(0, 1_000_000).expect("advance");
        assert_eq!(acc.accumulated, 0);
    }

    #[test]
    fn test_time_reversal_rejected() {
        let acc = StakeTime::new(500);
        assert_eq!(
            acc.advance(1, 499),
            Err(AccrualError::TimeReversed {
                last_update: 500,
                now: 499
            })
        );
    }

    #[test]
    fn test_overflow_rejected() {
        let acc = StakeTime::new(0);
        assert_eq!(acc.advance(u128::MAX, 2), Err(AccrualError::Overflow));
    }

    #[test]
    fn test_remove_underflow_rejected() {
        let mut acc = StakeTime::new(0).advance(1, 10).expect("advance");
        assert!(acc.remove(11).is_err());
        acc.remove(10).expect("remove");
        assert_eq!(acc.accumulated, 0);
    }
}
