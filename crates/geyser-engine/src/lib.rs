//! # geyser-engine
//!
//! Reward distribution engine.
//!
//! A [`pool::Pool`] distributes funded reward tokens to stakers pro rata to
//! their stake-time, scaled by how long the withdrawn stake was held. Reward
//! funding is recorded as fixed-point shares whose token value floats with
//! the pool's actual balance, so elastic-supply reward tokens are paid out
//! correctly after any rebase.
//!
//! Every mutating operation is atomic: it stages copies of the pool and the
//! vault, applies the token movements as a single ledger batch, and only then
//! commits the staged state.
//!
//! ## Modules
//!
//! - [`math`] — 256-bit `mul_div`
//! - [`funding`] — Reward schedules and share accounting
//! - [`scaling`] — Duration multiplier ramp
//! - [`lifecycle`] — Online/Offline/Shutdown switch
//! - [`pool`] — Pool state and stake-time accumulator
//! - [`settlement`] — Reward quote shared by withdrawals and projections
//! - [`deposit`] — Stake deposits
//! - [`withdraw`] — Withdrawals and reward settlement
//! - [`admin`] — Funding, lifecycle, bonus assets, rescue, rage quit
//! - [`projection`] — Read-only views for the stats layer

pub mod admin;
pub mod deposit;
pub mod funding;
pub mod lifecycle;
pub mod math;
pub mod pool;
pub mod projection;
pub mod scaling;
pub mod settlement;
pub mod withdraw;

#[cfg(test)]
mod testkit;

use geyser_types::{AccrualError, LifecycleState};
use geyser_vault::VaultError;

pub use funding::{FundingLedger, RewardSchedule};
pub use pool::{Pool, PoolConfig};
pub use scaling::ScalingParams;

/// Error types for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ---- Authorization ----
    /// Caller is not the pool admin.
    #[error("caller is not the pool admin")]
    NotAdmin,

    /// Custody or permission failure.
    #[error(transparent)]
    Vault(#[from] VaultError),

    // ---- State ----
    /// The pool is not accepting mutating operations.
    #[error("pool is {0}, not online")]
    NotOnline(LifecycleState),

    /// Lifecycle transition not allowed.
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: LifecycleState,
        /// Requested state.
        to: LifecycleState,
    },

    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// Funding duration is zero.
    #[error("funding duration is zero")]
    ZeroDuration,

    /// Scaling parameters out of range.
    #[error("invalid scaling: {0}")]
    InvalidScaling(String),

    /// Bonus asset already registered.
    #[error("bonus asset already registered")]
    DuplicateBonus,

    /// Asset is accounted by the pool and cannot be registered or rescued.
    #[error("asset is protected by the pool")]
    ProtectedAsset,

    // ---- Arithmetic ----
    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow.
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Stake-time accrual failed.
    #[error(transparent)]
    Accrual(#[from] AccrualError),

    // ---- Consistency ----
    /// A payout exceeds the pool's balance.
    #[error("insolvent: payout {required} exceeds balance {available}")]
    Insolvent {
        /// Pool balance of the asset.
        available: u128,
        /// Computed payout.
        required: u128,
    },
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
