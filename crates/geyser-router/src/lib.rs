//! # geyser-router
//!
//! Batching front door.
//!
//! Composes custody and pool operations into single logical operations:
//! create a vault, fund it from the depositor and stake, or run several
//! stakes and withdrawals against one vault. The router adds no accounting
//! of its own. Each macro runs against staged copies of the pool, the vault
//! and the token ledger; if any step fails, nothing is committed.
//!
//! ## Modules
//!
//! - [`batch`] — Atomic stake and withdraw macros

pub mod batch;

use geyser_engine::EngineError;
use geyser_vault::VaultError;

/// Error types for router macros.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A pool operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A custody operation failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The macro contains no steps.
    #[error("empty batch")]
    EmptyBatch,
}

/// Convenience result type for router macros.
pub type Result<T> = std::result::Result<T, RouterError>;
