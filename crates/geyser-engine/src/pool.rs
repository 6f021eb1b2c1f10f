//! Pool state.
//!
//! A pool is an isolated unit of state: its own stake-time accumulator,
//! funding ledger, scaling curve, bonus assets and lifecycle. Reward and
//! bonus tokens are held in the token ledger under the pool id. Staked
//! tokens never leave their vaults.
//!
//! Invariants, for every vault `v` registered with the pool:
//!
//! ```text
//! total_stake          == sum(v.staked(pool, staking_asset))
//! total_stake_time(t)  == sum(v.stake_time_at(pool, staking_asset, t))
//! ```

use geyser_crypto::blake3;
use geyser_types::events::{SettlementKind, SettlementRecord};
use geyser_types::{Address, AssetId, LifecycleState, PoolId, StakeTime};
use geyser_vault::ledger::TokenLedger;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::funding::FundingLedger;
use crate::scaling::ScalingParams;
use crate::{EngineError, Result};

/// Parameters fixed at pool creation.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub admin: Address,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub staking_asset: AssetId,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub reward_asset: AssetId,
    pub scaling: ScalingParams,
}

/// One reward program.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub id: PoolId,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub admin: Address,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub staking_asset: AssetId,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub reward_asset: AssetId,
    pub total_stake: u128,
    pub stake_time: StakeTime,
    pub funding: FundingLedger,
    pub scaling: ScalingParams,
    #[serde_as(as = "Vec<serde_with::hex::Hex>")]
    pub bonus_assets: Vec<AssetId>,
    pub lifecycle: LifecycleState,
    pub created_at: u64,
    /// Settlement records emitted so far.
    pub settlement_seq: u64,
}

impl Pool {
    /// Create an Online pool with no stake and no schedules.
    pub fn create(config: PoolConfig, now: u64) -> Result<Self> {
        config.scaling.validate()?;
        let id = Self::derive_id(
            &config.admin,
            &config.staking_asset,
            &config.reward_asset,
            now,
        );

        tracing::info!(
            pool = %hex::encode(&id[..4]),
            floor_pct = config.scaling.floor_pct,
            ceiling_pct = config.scaling.ceiling_pct,
            ramp = config.scaling.ramp_duration,
            "pool created"
        );

        Ok(Self {
            id,
            admin: config.admin,
            staking_asset: config.staking_asset,
            reward_asset: config.reward_asset,
            total_stake: 0,
            stake_time: StakeTime::new(now),
            funding: FundingLedger::new(),
            scaling: config.scaling,
            bonus_assets: Vec::new(),
            lifecycle: LifecycleState::Online,
            created_at: now,
            settlement_seq: 0,
        })
    }

    /// `pool_id = BLAKE3::derive_key("Geyser v1 pool-id", admin || staking || reward || LE64(now))`
    pub fn derive_id(
        admin: &Address,
        staking_asset: &AssetId,
        reward_asset: &AssetId,
        now: u64,
    ) -> PoolId {
        let created = now.to_le_bytes();
        let material =
            blake3::encode_multi_field(&[admin, staking_asset, reward_asset, &created]);
        blake3::derive_key(blake3::contexts::POOL_ID, &material)
    }

    /// Pure accumulator advance to `now`.
    pub fn advance(mut self, now: u64) -> Result<Self> {
        self.stake_time = self.stake_time.advance(self.total_stake, now)?;
        tracing::trace!(
            pool = %hex::encode(&self.id[..4]),
            total_stake_time = self.stake_time.accumulated,
            now,
            "pool accumulator advanced"
        );
        Ok(self)
    }

    /// Pool-wide stake-time at `now`.
    pub fn total_stake_time(&self, now: u64) -> Result<u128> {
        Ok(self.stake_time.at(self.total_stake, now)?)
    }

    /// Reward tokens held by the pool.
    pub fn reward_balance(&self, ledger: &TokenLedger) -> u128 {
        ledger.balance_of(&self.id, &self.reward_asset)
    }

    pub fn is_admin(&self, caller: &Address) -> bool {
        self.admin == *caller
    }

    pub(crate) fn require_admin(&self, caller: &Address) -> Result<()> {
        if !self.is_admin(caller) {
            tracing::warn!(pool = %hex::encode(&self.id[..4]), "admin operation rejected");
            return Err(EngineError::NotAdmin);
        }
        Ok(())
    }

    /// Assets whose pool balance is accounted by the engine.
    pub fn is_accounted_asset(&self, asset: &AssetId) -> bool {
        *asset == self.reward_asset || self.bonus_assets.contains(asset)
    }

    /// Build the next settlement record.
    pub(crate) fn record(&mut self, now: u64, kind: SettlementKind) -> Result<SettlementRecord> {
        let seq = self.settlement_seq;
        let seq_le = seq.to_le_bytes();
        let id = blake3::derive_key(
            blake3::contexts::SETTLEMENT_ID,
            &blake3::encode_multi_field(&[&self.id, &seq_le]),
        );
        self.settlement_seq = seq.checked_add(1).ok_or(EngineError::Overflow)?;
        Ok(SettlementRecord {
            id,
            pool: self.id,
            timestamp: now,
            kind,
        })
    }
}
