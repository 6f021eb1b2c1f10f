//! Reward funding ledger.
//!
//! Each funding event becomes an immutable [`RewardSchedule`] of fixed-point
//! shares that unlock linearly over the schedule's duration. Shares are
//! minted at the constant rate of [`SHARE_PRECISION`] per funded token, so a
//! schedule's proportional claim on the pool never changes; the token value
//! of a share is recomputed from the pool's live balance at redemption.
//!
//! ## Formulas
//!
//! ```text
//! unlocked_i(t)  = shares_i * clamp(t - start_i, 0, duration_i) / duration_i
//! locked(t)      = sum(shares_i - unlocked_i(t))
//! redeemable(t)  = outstanding - locked(t)
//! value(t)       = redeemable(t) * balance / outstanding
//! ```
//!
//! `redeemable` nets out shares already redeemed by earlier withdrawals, so
//! value paid once is never paid again.

use geyser_types::SHARE_PRECISION;
use serde::{Deserialize, Serialize};

use crate::math::mul_div;
use crate::{EngineError, Result};

/// One funding event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub start: u64,
    pub duration: u64,
    pub shares: u128,
}

impl RewardSchedule {
    /// Shares of this schedule unlocked at `t`. Monotone in `t`.
    pub fn unlocked_at(&self, t: u64) -> Result<u128> {
        let elapsed = t.saturating_sub(self.start).min(self.duration);
        mul_div(self.shares, u128::from(elapsed), u128::from(self.duration))
    }

    /// Shares of this schedule still locked at `t`.
    pub fn locked_at(&self, t: u64) -> Result<u128> {
        Ok(self.shares - self.unlocked_at(t)?)
    }

    /// Timestamp at which every share of this schedule is unlocked.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.duration)
    }
}

/// Schedules plus the count of shares not yet redeemed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingLedger {
    schedules: Vec<RewardSchedule>,
    outstanding_shares: u128,
}

impl FundingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares minted for `amount` reward tokens.
    pub fn shares_for(amount: u128) -> Result<u128> {
        amount
            .checked_mul(SHARE_PRECISION)
            .ok_or(EngineError::Overflow)
    }

    /// Append a schedule of `amount` tokens unlocking over `duration` seconds
    /// from `now`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ZeroDuration`] if `duration` is zero
    /// - [`EngineError::ZeroAmount`] if `amount` is zero
    /// - [`EngineError::Overflow`] if the share count overflows
    pub fn append(&mut self, amount: u128, duration: u64, now: u64) -> Result<RewardSchedule> {
        if duration == 0 {
            return Err(EngineError::ZeroDuration);
        }
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        let shares = Self::shares_for(amount)?;
        let outstanding = self
            .outstanding_shares
            .checked_add(shares)
            .ok_or(EngineError::Overflow)?;

        let schedule = RewardSchedule {
            start: now,
            duration,
            shares,
        };
        self.schedules.push(schedule);
        self.outstanding_shares = outstanding;
        Ok(schedule)
    }

    pub fn schedules(&self) -> &[RewardSchedule] {
        &self.schedules
    }

    pub fn outstanding_shares(&self) -> u128 {
        self.outstanding_shares
    }

    /// Sum of shares ever minted.
    pub fn total_shares(&self) -> Result<u128> {
        self.schedules.iter().try_fold(0u128, |acc, s| {
            acc.checked_add(s.shares).ok_or(EngineError::Overflow)
        })
    }

    /// Gross shares unlocked by every schedule at `t`, redeemed or not.
    pub fn unlocked_shares(&self, t: u64) -> Result<u128> {
        self.schedules.iter().try_fold(0u128, |acc, s| {
            acc.checked_add(s.unlocked_at(t)?)
                .ok_or(EngineError::Overflow)
        })
    }

    /// Shares still locked across all schedules at `t`.
    pub fn locked_shares(&self, t: u64) -> Result<u128> {
        self.schedules.iter().try_fold(0u128, |acc, s| {
            acc.checked_add(s.locked_at(t)?)
                .ok_or(EngineError::Overflow)
        })
    }

    /// Unlocked shares not yet redeemed at `t`.
    pub fn redeemable_shares(&self, t: u64) -> Result<u128> {
        self.outstanding_shares
            .checked_sub(self.locked_shares(t)?)
            .ok_or(EngineError::Underflow)
    }

    /// Token value of `shares` against a pool balance. Zero when nothing is
    /// outstanding.
    pub fn share_value(&self, shares: u128, balance: u128) -> Result<u128> {
        if self.outstanding_shares == 0 {
            return Ok(0);
        }
        mul_div(shares, balance, self.outstanding_shares)
    }

    /// Reward tokens currently claimable by the whole pool.
    pub fn unlocked_value(&self, balance: u128, t: u64) -> Result<u128> {
        self.share_value(self.redeemable_shares(t)?, balance)
    }

    /// Shares backing `value` tokens at the current exchange rate, floored.
    pub fn shares_for_value(&self, value: u128, balance: u128) -> Result<u128> {
        if value == 0 {
            return Ok(0);
        }
        mul_div(value, self.outstanding_shares, balance)
    }

    /// Retire redeemed shares.
    pub fn redeem(&mut self, shares: u128) -> Result<()> {
        self.outstanding_shares = self
            .outstanding_shares
            .checked_sub(shares)
            .ok_or(EngineError::Underflow)?;
        Ok(())
    }
}
