//! # geyser-vault
//!
//! Delegated custody for staked tokens.
//!
//! A vault holds a depositor's tokens and never moves a locked balance except
//! under a single-use, owner-signed permission. The staking controller locks
//! and unlocks stake through those permissions without ever holding the
//! tokens itself.
//!
//! ## Modules
//!
//! - [`ledger`] — Token balance book shared by vaults, pools and recipients
//! - [`lots`] — LIFO stack of time-stamped deposit lots
//! - [`permission`] — Signed lock/unlock permissions and authorizations
//! - [`vault`] — Custody account with locks, nonce and free balance

pub mod ledger;
pub mod lots;
pub mod permission;
pub mod vault;

use geyser_types::AccrualError;

/// Error types for custody operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Holder balance too small for a transfer.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Balance held.
        available: u128,
        /// Amount requested.
        required: u128,
    },

    /// Unlocked balance too small.
    #[error("insufficient free balance: have {available}, need {required}")]
    InsufficientFreeBalance {
        /// Balance not covered by locks.
        available: u128,
        /// Amount requested.
        required: u128,
    },

    /// Withdrawal exceeds the position's stake.
    #[error("insufficient stake: staked {staked}, requested {requested}")]
    InsufficientStake {
        /// Currently staked amount.
        staked: u128,
        /// Amount requested.
        requested: u128,
    },

    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// The permission signature does not match the vault owner.
    #[error("invalid permission signature")]
    InvalidSignature,

    /// The permission nonce is not the vault's current nonce.
    #[error("stale nonce: expected {expected}, got {actual}")]
    StaleNonce {
        /// Nonce the vault expects.
        expected: u64,
        /// Nonce presented.
        actual: u64,
    },

    /// The permission does not cover the requested operation.
    #[error("permission mismatch: {0}")]
    PermissionMismatch(String),

    /// Caller is not the vault owner.
    #[error("caller is not the vault owner")]
    NotOwner,

    /// The delegate holds no lock on this asset.
    #[error("delegate does not hold a lock on this asset")]
    NotLockHolder,

    /// Position already holds the maximum number of lots.
    #[error("too many lots: maximum {max}")]
    TooManyLots {
        /// The lot cap.
        max: usize,
    },

    /// Rebase ratio is invalid.
    #[error("invalid rebase ratio {numerator}/{denominator}")]
    InvalidRebase {
        /// Ratio numerator.
        numerator: u128,
        /// Ratio denominator.
        denominator: u128,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Stake-time accrual failed.
    #[error(transparent)]
    Accrual(#[from] AccrualError),
}

/// Convenience result type for custody operations.
pub type Result<T> = std::result::Result<T, VaultError>;
