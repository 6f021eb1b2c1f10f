//! Reward quote.
//!
//! The single computation behind both real withdrawals and the read-only
//! projections, so a projection for the same inputs is bit-identical to what
//! settlement pays.
//!
//! ```text
//! value      = redeemable_shares(t) * balance / outstanding_shares
//! base       = value * units / total_stake_time(t)
//! reward     = base * multiplier(effective_duration)
//! redeemed   = reward * outstanding_shares / balance
//! bonus_k    = (bonus_balance_k * units / total_stake_time(t)) * multiplier
//! ```

use geyser_types::events::BonusPayout;
use geyser_types::stats::RewardProjection;
use geyser_vault::ledger::TokenLedger;

use crate::math::mul_div;
use crate::pool::Pool;
use crate::{EngineError, Result};

/// Stake being settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub amount: u128,
    /// Stake-seconds of the withdrawn stake.
    pub units: u128,
    /// Amount-weighted average age of the withdrawn stake.
    pub effective_duration: u64,
}

/// Outcome of settling a [`Withdrawal`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub withdrawal: Withdrawal,
    /// Pool-wide stake-time the units are measured against.
    pub total_stake_time: u128,
    /// Reward tokens claimable by the whole pool.
    pub unlocked_value: u128,
    pub base_reward: u128,
    pub reward: u128,
    pub redeemed_shares: u128,
    pub bonus: Vec<BonusPayout>,
    pub multiplier_bps: u32,
    pub as_of: u64,
}

impl Quote {
    /// Unscaled remainder left in the pool.
    pub fn forfeited(&self) -> u128 {
        self.base_reward - self.reward
    }

    pub fn projection(&self) -> RewardProjection {
        RewardProjection {
            amount: self.withdrawal.amount,
            effective_duration: self.withdrawal.effective_duration,
            multiplier_bps: self.multiplier_bps,
            base_reward: self.base_reward,
            reward: self.reward,
            as_of: self.as_of,
        }
    }
}

/// Quote `withdrawal` against `pool` at time `t`.
///
/// `total_stake_time` must include the withdrawal's own units.
///
/// # Errors
///
/// - [`EngineError::DivisionByZero`] if units are positive but the pool has
///   no stake-time
/// - [`EngineError::Insolvent`] if any payout exceeds the pool's balance
pub fn quote(
    pool: &Pool,
    ledger: &TokenLedger,
    withdrawal: Withdrawal,
    total_stake_time: u128,
    t: u64,
) -> Result<Quote> {
    let balance = pool.reward_balance(ledger);
    let unlocked_value = pool.funding.unlocked_value(balance, t)?;

    let base_reward = pro_rata(unlocked_value, withdrawal.units, total_stake_time)?;
    let reward = pool
        .scaling
        .apply(base_reward, withdrawal.effective_duration)?;
    solvent(reward, balance)?;
    let redeemed_shares = pool.funding.shares_for_value(reward, balance)?;

    let mut bonus = Vec::with_capacity(pool.bonus_assets.len());
    for asset in &pool.bonus_assets {
        let bonus_balance = ledger.balance_of(&pool.id, asset);
        let share = pro_rata(bonus_balance, withdrawal.units, total_stake_time)?;
        let amount = pool.scaling.apply(share, withdrawal.effective_duration)?;
        solvent(amount, bonus_balance)?;
        bonus.push(BonusPayout {
            asset: *asset,
            amount,
        });
    }

    Ok(Quote {
        withdrawal,
        total_stake_time,
        unlocked_value,
        base_reward,
        reward,
        redeemed_shares,
        bonus,
        multiplier_bps: pool.scaling.multiplier_bps(withdrawal.effective_duration)?,
        as_of: t,
    })
}

fn pro_rata(value: u128, units: u128, total_stake_time: u128) -> Result<u128> {
    if units == 0 {
        return Ok(0);
    }
    if units > total_stake_time {
        return Err(EngineError::Underflow);
    }
    mul_div(value, units, total_stake_time)
}

fn solvent(payout: u128, balance: u128) -> Result<()> {
    if payout > balance {
        tracing::error!(payout, balance, "settlement would overdraw the pool");
        return Err(EngineError::Insolvent {
            available: balance,
            required: payout,
        });
    }
    Ok(())
}
