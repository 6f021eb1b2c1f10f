//! Admin operations and the rage-quit exit hatch.

use geyser_types::events::{SettlementKind, SettlementRecord};
use geyser_types::{Address, AssetId, LifecycleState};
use geyser_vault::ledger::TokenLedger;
use geyser_vault::vault::Vault;

use crate::lifecycle::{check_transition, require_online};
use crate::pool::Pool;
use crate::{EngineError, Result};

impl Pool {
    /// Fund the pool with `amount` reward tokens unlocking over `duration`
    /// seconds from `now`. Tokens move from the admin to the pool.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotOnline`] unless the pool is Online
    /// - [`EngineError::NotAdmin`] if `caller` is not the admin
    /// - [`EngineError::ZeroDuration`] / [`EngineError::ZeroAmount`]
    /// - [`EngineError::Vault`] if the admin cannot cover `amount`
    pub fn fund(
        &mut self,
        caller: &Address,
        ledger: &mut TokenLedger,
        amount: u128,
        duration: u64,
        now: u64,
    ) -> Result<SettlementRecord> {
        require_online(self.lifecycle)?;
        self.require_admin(caller)?;

        let mut staged = self.clone();
        let schedule = staged.funding.append(amount, duration, now)?;
        let record = staged.record(
            now,
            SettlementKind::Funded {
                amount,
                duration,
                shares: schedule.shares,
            },
        )?;
        ledger.transfer(caller, &staged.id, &staged.reward_asset, amount)?;

        tracing::info!(
            pool = %hex::encode(&staged.id[..4]),
            amount,
            duration,
            shares = schedule.shares,
            outstanding = staged.funding.outstanding_shares(),
            "pool funded"
        );
        *self = staged;
        Ok(record)
    }

    /// Move the lifecycle switch.
    pub fn set_lifecycle(
        &mut self,
        caller: &Address,
        target: LifecycleState,
        now: u64,
    ) -> Result<SettlementRecord> {
        self.require_admin(caller)?;
        let from = self.lifecycle;
        check_transition(from, target)?;

        let mut staged = self.clone();
        staged.lifecycle = target;
        let record = staged.record(now, SettlementKind::LifecycleChanged { from, to: target })?;

        tracing::info!(pool = %hex::encode(&staged.id[..4]), %from, to = %target, "lifecycle changed");
        *self = staged;
        Ok(record)
    }

    /// Register a secondary reward asset paid pro rata on withdrawal.
    pub fn register_bonus_asset(
        &mut self,
        caller: &Address,
        asset: AssetId,
        now: u64,
    ) -> Result<SettlementRecord> {
        require_online(self.lifecycle)?;
        self.require_admin(caller)?;
        if asset == self.staking_asset || asset == self.reward_asset {
            return Err(EngineError::ProtectedAsset);
        }
        if self.bonus_assets.contains(&asset) {
            return Err(EngineError::DuplicateBonus);
        }

        let mut staged = self.clone();
        staged.bonus_assets.push(asset);
        let record = staged.record(now, SettlementKind::BonusAssetRegistered { asset })?;

        tracing::info!(
            pool = %hex::encode(&staged.id[..4]),
            asset = %hex::encode(&asset[..4]),
            bonus_assets = staged.bonus_assets.len(),
            "bonus asset registered"
        );
        *self = staged;
        Ok(record)
    }

    /// Return tokens mistakenly sent to the pool.
    ///
    /// The reward asset and registered bonus assets are accounted by the
    /// engine and cannot be rescued.
    pub fn rescue_tokens(
        &mut self,
        caller: &Address,
        ledger: &mut TokenLedger,
        asset: AssetId,
        recipient: Address,
        amount: u128,
        now: u64,
    ) -> Result<SettlementRecord> {
        require_online(self.lifecycle)?;
        self.require_admin(caller)?;
        if self.is_accounted_asset(&asset) {
            return Err(EngineError::ProtectedAsset);
        }
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }

        let mut staged = self.clone();
        let record = staged.record(
            now,
            SettlementKind::TokensRescued {
                asset,
                recipient,
                amount,
            },
        )?;
        ledger.transfer(&staged.id, &recipient, &asset, amount)?;

        tracing::info!(pool = %hex::encode(&staged.id[..4]), asset = %hex::encode(&asset[..4]), amount, "tokens rescued");
        *self = staged;
        Ok(record)
    }

    /// Owner-forced exit that pays no reward.
    ///
    /// Allowed in every lifecycle state. The vault's stake and its whole
    /// stake-time are removed from the pool totals and its lock is dropped;
    /// the tokens become free balance in the vault.
    pub fn rage_quit(
        &mut self,
        vault: &mut Vault,
        caller: &Address,
        now: u64,
    ) -> Result<SettlementRecord> {
        let mut staged_vault = vault.clone();
        let position = staged_vault.rage_quit(caller, &self.id, &self.staking_asset, now)?;

        let mut staged = self.clone().advance(now)?;
        let amount = position.staked();
        staged.total_stake = staged
            .total_stake
            .checked_sub(amount)
            .ok_or(EngineError::Underflow)?;
        staged.stake_time.remove(position.stake_time.accumulated)?;

        let record = staged.record(
            now,
            SettlementKind::RageQuit {
                vault: staged_vault.id,
                amount,
            },
        )?;

        tracing::warn!(
            pool = %hex::encode(&staged.id[..4]),
            vault = %hex::encode(&staged_vault.id[..4]),
            amount,
            stake_time = position.stake_time.accumulated,
            "rage quit"
        );
        *self = staged;
        *vault = staged_vault;
        Ok(record)
    }
}
