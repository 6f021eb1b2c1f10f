//! Read-only projections for the stats layer.
//!
//! These shapes are exported to TypeScript so that dashboards render exactly
//! the figures the engine would settle.

use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;

/// Pool-wide snapshot at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PoolStats {
    /// Hex-encoded pool id.
    pub pool_id: String,
    pub lifecycle: LifecycleState,
    pub total_stake: u128,
    pub total_stake_time: u128,
    pub outstanding_shares: u128,
    pub locked_shares: u128,
    pub schedule_count: u32,
    /// Reward tokens currently held by the pool.
    pub reward_balance: u128,
    /// Reward tokens currently claimable by the whole pool.
    pub unlocked_reward_value: u128,
    pub as_of: u64,
}

/// Outcome of a real or hypothetical withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct RewardProjection {
    /// Stake withdrawn.
    pub amount: u128,
    /// Amount-weighted average age of the withdrawn stake in seconds.
    pub effective_duration: u64,
    /// Multiplier in basis points.
    pub multiplier_bps: u32,
    /// Pro-rata reward before scaling.
    pub base_reward: u128,
    /// Reward after scaling.
    pub reward: u128,
    pub as_of: u64,
}
