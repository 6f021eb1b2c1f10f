//! Settlement records.
//!
//! Every successful mutating engine operation produces exactly one
//! [`SettlementRecord`]. The records form the append-only log that the
//! indexer replays; they are never authoritative over engine state.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::lifecycle::LifecycleState;
use crate::{Address, AssetId, Hash, PoolId, VaultId};

/// Envelope for all settlement records.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Unique record identifier.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub id: Hash,
    /// The pool that produced the record.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub pool: PoolId,
    /// Unix timestamp of the operation.
    pub timestamp: u64,
    /// Type-specific payload.
    pub kind: SettlementKind,
}

/// A secondary reward asset paid alongside the primary reward.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPayout {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub asset: AssetId,
    pub amount: u128,
}

/// All record payloads.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// A reward schedule was appended.
    Funded {
        amount: u128,
        duration: u64,
        shares: u128,
    },
    /// Stake was locked into the pool.
    Deposited {
        #[serde_as(as = "serde_with::hex::Hex")]
        vault: VaultId,
        amount: u128,
    },
    /// Stake was withdrawn and rewards settled.
    Withdrawn {
        #[serde_as(as = "serde_with::hex::Hex")]
        vault: VaultId,
        #[serde_as(as = "serde_with::hex::Hex")]
        recipient: Address,
        amount: u128,
        /// Reward tokens paid to the recipient.
        reward: u128,
        /// Unscaled remainder left in the pool.
        forfeited: u128,
        bonus: Vec<BonusPayout>,
    },
    /// A vault owner forcibly released its stake without reward.
    RageQuit {
        #[serde_as(as = "serde_with::hex::Hex")]
        vault: VaultId,
        amount: u128,
    },
    /// The lifecycle switch changed state.
    LifecycleChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// A secondary reward asset was registered.
    BonusAssetRegistered {
        #[serde_as(as = "serde_with::hex::Hex")]
        asset: AssetId,
    },
    /// Stray tokens were returned from pool custody.
    TokensRescued {
        #[serde_as(as = "serde_with::hex::Hex")]
        asset: AssetId,
        #[serde_as(as = "serde_with::hex::Hex")]
        recipient: Address,
        amount: u128,
    },
}

impl SettlementKind {
    /// Stable snake_case name of the record type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Funded { .. } => "funded",
            Self::Deposited { .. } => "deposited",
            Self::Withdrawn { .. } => "withdrawn",
            Self::RageQuit { .. } => "rage_quit",
            Self::LifecycleChanged { .. } => "lifecycle_changed",
            Self::BonusAssetRegistered { .. } => "bonus_asset_registered",
            Self::TokensRescued { .. } => "tokens_rescued",
        }
    }

    /// The vault this record concerns, if any.
    pub fn vault(&self) -> Option<&VaultId> {
        match self {
            Self::Deposited { vault, .. }
            | Self::Withdrawn { vault, .. }
            | Self::RageQuit { vault, .. } => Some(vault),
            _ => None,
        }
    }
}
