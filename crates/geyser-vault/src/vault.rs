//! Custody account.
//!
//! A vault holds its owner's tokens in the [`TokenLedger`] under its own id.
//! Delegates (staking pools) lock part of that balance into a position; each
//! position carries the LIFO lot stack and the position's stake-time
//! accumulator. Locked tokens stay in the vault and can only leave through an
//! unlock authorized by the owner, or through the owner's rage quit.

use geyser_crypto::blake3;
use geyser_crypto::ed25519::{derive_address, VerifyingKey};
use geyser_types::{Address, AssetId, StakeTime, VaultId};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::ledger::{TokenLedger, Transfer};
use crate::lots::LotStack;
use crate::permission::{Authorization, Permission, PermissionOp};
use crate::{Result, VaultError};

/// Stake locked by one delegate for one asset.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub delegate: Address,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub asset: AssetId,
    pub lots: LotStack,
    pub stake_time: StakeTime,
}

impl Position {
    fn new(delegate: Address, asset: AssetId, now: u64) -> Self {
        Self {
            delegate,
            asset,
            lots: LotStack::new(),
            stake_time: StakeTime::new(now),
        }
    }

    /// Amount currently locked.
    pub fn staked(&self) -> u128 {
        self.lots.total()
    }

    /// Stake-time of this position at `now`.
    pub fn stake_time_at(&self, now: u64) -> Result<u128> {
        Ok(self.stake_time.at(self.staked(), now)?)
    }

    fn matches(&self, delegate: &Address, asset: &AssetId) -> bool {
        self.delegate == *delegate && self.asset == *asset
    }
}

/// Stake released by an authorized unlock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub vault: VaultId,
    pub asset: AssetId,
    pub amount: u128,
    /// `sum(consumed_i * age_i)` over the consumed lots.
    pub weighted_stake_seconds: u128,
    /// Stake left in the position.
    pub remaining: u128,
}

impl Release {
    /// The transfer paying the released stake to `recipient`.
    pub fn transfer_to(&self, recipient: Address) -> Transfer {
        Transfer {
            from: self.vault,
            to: recipient,
            asset: self.asset,
            amount: self.amount,
        }
    }

    /// Amount-weighted average age of the released stake, floored.
    pub fn effective_duration(&self) -> u64 {
        if self.amount == 0 {
            return 0;
        }
        u64::try_from(self.weighted_stake_seconds / self.amount).unwrap_or(u64::MAX)
    }
}

/// A per-depositor custody account.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub id: VaultId,
    pub owner: VerifyingKey,
    /// Next permission nonce. Advanced once per verified permission.
    pub nonce: u64,
    positions: Vec<Position>,
}

impl Vault {
    /// Create an empty vault owned by `owner`.
    pub fn create(owner: VerifyingKey, salt: &[u8]) -> Self {
        let id = Self::derive_id(&owner, salt);
        tracing::info!(vault = %hex::encode(&id[..4]), "vault created");
        Self {
            id,
            owner,
            nonce: 0,
            positions: Vec::new(),
        }
    }

    /// `vault_id = BLAKE3::derive_key("Geyser v1 vault-id", owner || salt)`
    pub fn derive_id(owner: &VerifyingKey, salt: &[u8]) -> VaultId {
        let material = blake3::encode_multi_field(&[owner.as_bytes(), salt]);
        blake3::derive_key(blake3::contexts::VAULT_ID, &material)
    }

    /// Account address of the vault owner.
    pub fn owner_address(&self) -> Address {
        derive_address(&self.owner)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, delegate: &Address, asset: &AssetId) -> Option<&Position> {
        self.positions.iter().find(|p| p.matches(delegate, asset))
    }

    /// Amount locked by `delegate` in `asset`.
    pub fn staked(&self, delegate: &Address, asset: &AssetId) -> u128 {
        self.position(delegate, asset)
            .map(Position::staked)
            .unwrap_or_default()
    }

    /// Stake-time of the `(delegate, asset)` position at `now`.
    pub fn stake_time_at(&self, delegate: &Address, asset: &AssetId, now: u64) -> Result<u128> {
        match self.position(delegate, asset) {
            Some(position) => position.stake_time_at(now),
            None => Ok(0),
        }
    }

    /// Sum of every active lock on `asset`.
    pub fn locked_balance(&self, asset: &AssetId) -> Result<u128> {
        self.positions
            .iter()
            .filter(|p| p.asset == *asset)
            .try_fold(0u128, |acc, p| {
                acc.checked_add(p.staked()).ok_or(VaultError::Overflow)
            })
    }

    /// Balance of `asset` not covered by any lock.
    pub fn free_balance(&self, ledger: &TokenLedger, asset: &AssetId) -> Result<u128> {
        let total = ledger.balance_of(&self.id, asset);
        Ok(total.saturating_sub(self.locked_balance(asset)?))
    }

    /// Verify a permission and consume the current nonce.
    ///
    /// The permission must name this vault, the requested operation, the
    /// calling delegate, the asset and the exact amount, and be signed over
    /// the vault's current nonce by the owner.
    ///
    /// # Errors
    ///
    /// - [`VaultError::PermissionMismatch`] if any named field differs
    /// - [`VaultError::StaleNonce`] if the nonce is not current
    /// - [`VaultError::InvalidSignature`] if the owner did not sign it
    pub fn verify_permission(
        &mut self,
        permission: &Permission,
        op: PermissionOp,
        delegate: &Address,
        asset: &AssetId,
        amount: u128,
    ) -> Result<Authorization> {
        let mismatch = if permission.vault != self.id {
            Some("vault")
        } else if permission.op != op {
            Some("operation")
        } else if permission.delegate != *delegate {
            Some("delegate")
        } else if permission.asset != *asset {
            Some("asset")
        } else if permission.amount != amount {
            Some("amount")
        } else {
            None
        };
        if let Some(field) = mismatch {
            tracing::warn!(vault = %hex::encode(&self.id[..4]), field, "permission rejected");
            return Err(VaultError::PermissionMismatch(field.to_string()));
        }

        if permission.nonce != self.nonce {
            tracing::warn!(
                vault = %hex::encode(&self.id[..4]),
                expected = self.nonce,
                actual = permission.nonce,
                "permission rejected: stale nonce"
            );
            return Err(VaultError::StaleNonce {
                expected: self.nonce,
                actual: permission.nonce,
            });
        }

        if self
            .owner
            .verify(&permission.digest(), &permission.signature)
            .is_err()
        {
            tracing::warn!(vault = %hex::encode(&self.id[..4]), "permission rejected: bad signature");
            return Err(VaultError::InvalidSignature);
        }

        let nonce = self.nonce;
        self.nonce = nonce.checked_add(1).ok_or(VaultError::Overflow)?;

        Ok(Authorization {
            op,
            vault: self.id,
            delegate: *delegate,
            asset: *asset,
            amount,
            nonce,
        })
    }

    /// Lock `auth.amount` of free balance into the delegate's position.
    ///
    /// Pushes a new lot at `now` after advancing the position accumulator.
    pub fn lock(&mut self, auth: Authorization, ledger: &TokenLedger, now: u64) -> Result<()> {
        self.check_authorization(&auth, PermissionOp::Lock)?;
        if auth.amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let free = self.free_balance(ledger, &auth.asset)?;
        if free < auth.amount {
            return Err(VaultError::InsufficientFreeBalance {
                available: free,
                required: auth.amount,
            });
        }

        let existing = self
            .positions
            .iter()
            .position(|p| p.matches(&auth.delegate, &auth.asset));
        let mut position = match existing {
            Some(index) => self.positions[index].clone(),
            None => Position::new(auth.delegate, auth.asset, now),
        };
        position.stake_time = position.stake_time.advance(position.staked(), now)?;
        position.lots.push(auth.amount, now)?;

        tracing::debug!(
            vault = %hex::encode(&self.id[..4]),
            amount = auth.amount,
            lots = position.lots.len(),
            "stake locked"
        );
        match existing {
            Some(index) => self.positions[index] = position,
            None => self.positions.push(position),
        }
        Ok(())
    }

    /// Release `auth.amount` from the delegate's position, newest lots first.
    ///
    /// The consumed stake-seconds are removed from the position accumulator.
    /// A position left empty is dropped.
    pub fn unlock(&mut self, auth: Authorization, now: u64) -> Result<Release> {
        self.check_authorization(&auth, PermissionOp::Unlock)?;

        let index = self
            .positions
            .iter()
            .position(|p| p.matches(&auth.delegate, &auth.asset))
            .ok_or(VaultError::NotLockHolder)?;

        let mut position = self.positions[index].clone();
        position.stake_time = position.stake_time.advance(position.staked(), now)?;
        let consumed = position.lots.consume_latest(auth.amount, now)?;
        position.stake_time.remove(consumed.weighted_stake_seconds)?;

        let remaining = position.staked();
        if position.lots.is_empty() {
            self.positions.remove(index);
        } else {
            self.positions[index] = position;
        }

        tracing::debug!(
            vault = %hex::encode(&self.id[..4]),
            amount = consumed.amount,
            weighted = consumed.weighted_stake_seconds,
            remaining,
            "stake unlocked"
        );

        Ok(Release {
            vault: self.id,
            asset: auth.asset,
            amount: consumed.amount,
            weighted_stake_seconds: consumed.weighted_stake_seconds,
            remaining,
        })
    }

    /// Owner transfer of unlocked tokens out of the vault.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotOwner`] if `caller` is not the owner's address
    /// - [`VaultError::InsufficientFreeBalance`] if the amount would touch
    ///   locked stake
    pub fn transfer_out(
        &self,
        ledger: &mut TokenLedger,
        caller: &Address,
        asset: &AssetId,
        to: &Address,
        amount: u128,
    ) -> Result<()> {
        if *caller != self.owner_address() {
            return Err(VaultError::NotOwner);
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let free = self.free_balance(ledger, asset)?;
        if free < amount {
            return Err(VaultError::InsufficientFreeBalance {
                available: free,
                required: amount,
            });
        }
        ledger.transfer(&self.id, to, asset, amount)
    }

    /// Owner-forced release of a delegate's lock.
    ///
    /// Returns the dropped position with its accumulator advanced to `now`
    /// so the delegate can reconcile its totals. No nonce is consumed.
    pub fn rage_quit(
        &mut self,
        caller: &Address,
        delegate: &Address,
        asset: &AssetId,
        now: u64,
    ) -> Result<Position> {
        if *caller != self.owner_address() {
            return Err(VaultError::NotOwner);
        }
        let index = self
            .positions
            .iter()
            .position(|p| p.matches(delegate, asset))
            .ok_or(VaultError::NotLockHolder)?;

        let mut position = self.positions[index].clone();
        position.stake_time = position.stake_time.advance(position.staked(), now)?;
        self.positions.remove(index);

        tracing::warn!(
            vault = %hex::encode(&self.id[..4]),
            amount = position.staked(),
            "lock released by rage quit"
        );
        Ok(position)
    }

    fn check_authorization(&self, auth: &Authorization, op: PermissionOp) -> Result<()> {
        if auth.vault != self.id {
            return Err(VaultError::PermissionMismatch("vault".to_string()));
        }
        if auth.op != op {
            return Err(VaultError::PermissionMismatch("operation".to_string()));
        }
        let expected = auth.nonce.checked_add(1).ok_or(VaultError::Overflow)?;
        if self.nonce != expected {
            return Err(VaultError::StaleNonce {
                expected,
                actual: self.nonce,
            });
        }
        Ok(())
    }
}
