//! Read-only views for the stats layer.
//!
//! Every projection routes through the same [`settlement::quote`] as a real
//! withdrawal, so the figures a dashboard shows match what settlement pays.
//! None of these mutate state, and all are available in every lifecycle
//! state.
//!
//! Views are forward-only: an observation time before the pool's last
//! accumulator update fails with [`AccrualError::TimeReversed`].

use geyser_types::stats::{PoolStats, RewardProjection};
use geyser_types::AccrualError;
use geyser_vault::ledger::TokenLedger;
use geyser_vault::vault::Vault;

use crate::pool::Pool;
use crate::settlement::{self, Withdrawal};
use crate::{EngineError, Result};

impl Pool {
    fn require_forward(&self, t: u64) -> Result<()> {
        let last_update = self.stake_time.last_update;
        if t < last_update {
            return Err(AccrualError::TimeReversed { last_update, now: t }.into());
        }
        Ok(())
    }

    /// Shares still locked across all schedules at `t`.
    pub fn locked_shares(&self, t: u64) -> Result<u128> {
        self.funding.locked_shares(t)
    }

    /// Gross shares unlocked by every schedule at `t`.
    pub fn unlocked_shares(&self, t: u64) -> Result<u128> {
        self.funding.unlocked_shares(t)
    }

    /// Reward tokens currently claimable by the whole pool.
    pub fn unlocked_reward_value(&self, ledger: &TokenLedger, t: u64) -> Result<u128> {
        self.require_forward(t)?;
        self.funding.unlocked_value(self.reward_balance(ledger), t)
    }

    /// Claimable value at a future `t`, assuming the pool's balance and share
    /// count stay as they are at `now`.
    pub fn future_unlocked_reward_value(
        &self,
        ledger: &TokenLedger,
        now: u64,
        t: u64,
    ) -> Result<u128> {
        if t < now {
            return Err(AccrualError::TimeReversed {
                last_update: now,
                now: t,
            }
            .into());
        }
        self.unlocked_reward_value(ledger, t)
    }

    /// Multiplier for stake held `duration` seconds, in basis points.
    pub fn multiplier_at(&self, duration: u64) -> Result<u32> {
        self.scaling.multiplier_bps(duration)
    }

    /// Stake-time of `vault`'s position in this pool at `t`.
    pub fn vault_stake_time(&self, vault: &Vault, t: u64) -> Result<u128> {
        Ok(vault.stake_time_at(&self.id, &self.staking_asset, t)?)
    }

    /// Reward a full withdrawal of `vault`'s stake at `t` would pay.
    pub fn current_vault_reward(
        &self,
        vault: &Vault,
        ledger: &TokenLedger,
        t: u64,
    ) -> Result<RewardProjection> {
        let amount = vault.staked(&self.id, &self.staking_asset);
        if amount == 0 {
            return Ok(RewardProjection {
                amount: 0,
                effective_duration: 0,
                multiplier_bps: self.multiplier_at(0)?,
                base_reward: 0,
                reward: 0,
                as_of: t,
            });
        }

        let units = self.vault_stake_time(vault, t)?;
        let effective_duration = u64::try_from(units / amount).map_err(|_| EngineError::Overflow)?;
        let withdrawal = Withdrawal {
            amount,
            units,
            effective_duration,
        };
        let quote = settlement::quote(self, ledger, withdrawal, self.total_stake_time(t)?, t)?;
        Ok(quote.projection())
    }

    /// Reward of a hypothetical new deposit of `amount` held for `duration`
    /// seconds from `now`, with every existing staker staying put and no new
    /// funding.
    pub fn projected_reward(
        &self,
        ledger: &TokenLedger,
        amount: u128,
        duration: u64,
        now: u64,
    ) -> Result<RewardProjection> {
        let t = now.checked_add(duration).ok_or(EngineError::Overflow)?;
        let units = amount
            .checked_mul(u128::from(duration))
            .ok_or(EngineError::Overflow)?;
        let total_stake_time = self
            .total_stake_time(t)?
            .checked_add(units)
            .ok_or(EngineError::Overflow)?;

        let withdrawal = Withdrawal {
            amount,
            units,
            effective_duration: duration,
        };
        let quote = settlement::quote(self, ledger, withdrawal, total_stake_time, t)?;
        Ok(quote.projection())
    }

    /// Pool-wide snapshot at `t`.
    pub fn pool_stats(&self, ledger: &TokenLedger, t: u64) -> Result<PoolStats> {
        Ok(PoolStats {
            pool_id: hex::encode(self.id),
            lifecycle: self.lifecycle,
            total_stake: self.total_stake,
            total_stake_time: self.total_stake_time(t)?,
            outstanding_shares: self.funding.outstanding_shares(),
            locked_shares: self.locked_shares(t)?,
            schedule_count: u32::try_from(self.funding.schedules().len())
                .map_err(|_| EngineError::Overflow)?,
            reward_balance: self.reward_balance(ledger),
            unlocked_reward_value: self.unlocked_reward_value(ledger, t)?,
            as_of: t,
        })
    }
}
