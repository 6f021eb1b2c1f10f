//! # geyser-types
//!
//! Shared domain types used across the Geyser workspace: identifiers,
//! engine-wide constants, the stake-time accumulator, lifecycle states,
//! settlement records and the read-only projection shapes consumed by the
//! stats layer.

pub mod events;
pub mod lifecycle;
pub mod stake_time;
pub mod stats;

/// Common type aliases.
pub type Hash = [u8; 32];
/// A token holder: an owner account, a custody vault, a pool, or a recipient.
pub type Address = [u8; 32];
pub type AssetId = [u8; 32];
pub type VaultId = [u8; 32];
pub type PoolId = [u8; 32];

/// Reward shares minted per funded reward-token unit.
///
/// Six decimal places of sub-unit precision. Funding amounts above
/// `u128::MAX / SHARE_PRECISION` are rejected as overflow.
pub const SHARE_PRECISION: u128 = 1_000_000;

/// Maximum unexpired deposit lots held by one vault position.
pub const MAX_LOTS_PER_POSITION: usize = 30;

/// Seconds per day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Denominator of the scaling percentages.
pub const PERCENT: u128 = 100;

pub use lifecycle::LifecycleState;
pub use stake_time::{AccrualError, StakeTime};
