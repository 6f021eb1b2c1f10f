//! Signed lock/unlock permissions.
//!
//! A permission lets a named delegate lock or unlock a bounded amount of one
//! asset in a vault. It is bound to the vault's current nonce, so it can be
//! used at most once:
//!
//! ```text
//! digest = BLAKE3::derive_key("Geyser v1 permission-digest",
//!     encode_multi_field(op, vault, delegate, asset, LE128(amount), LE64(nonce)))
//! signature = Ed25519::sign(owner_sk, digest)
//! ```
//!
//! Successful verification yields an [`Authorization`]. It cannot be cloned
//! or constructed outside this crate, and is consumed by the lock or unlock
//! it was issued for.

use geyser_crypto::blake3;
use geyser_crypto::ed25519::{Signature, SigningKey};
use geyser_types::{Address, AssetId, VaultId};

/// The custody operation a permission grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionOp {
    Lock,
    Unlock,
}

impl PermissionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

/// An owner-signed, nonce-bound grant to a delegate.
#[derive(Clone, Debug)]
pub struct Permission {
    pub op: PermissionOp,
    pub vault: VaultId,
    pub delegate: Address,
    pub asset: AssetId,
    pub amount: u128,
    pub nonce: u64,
    pub signature: Signature,
}

impl Permission {
    /// Sign a permission with the vault owner's key.
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        owner: &SigningKey,
        op: PermissionOp,
        vault: VaultId,
        delegate: Address,
        asset: AssetId,
        amount: u128,
        nonce: u64,
    ) -> Self {
        let digest = permission_digest(op, &vault, &delegate, &asset, amount, nonce);
        Self {
            op,
            vault,
            delegate,
            asset,
            amount,
            nonce,
            signature: owner.sign(&digest),
        }
    }

    /// The digest covered by the signature.
    pub fn digest(&self) -> [u8; 32] {
        permission_digest(
            self.op,
            &self.vault,
            &self.delegate,
            &self.asset,
            self.amount,
            self.nonce,
        )
    }
}

/// Compute the permission digest.
pub fn permission_digest(
    op: PermissionOp,
    vault: &VaultId,
    delegate: &Address,
    asset: &AssetId,
    amount: u128,
    nonce: u64,
) -> [u8; 32] {
    let amount_le = amount.to_le_bytes();
    let nonce_le = nonce.to_le_bytes();
    let payload = blake3::encode_multi_field(&[
        op.as_str().as_bytes(),
        vault,
        delegate,
        asset,
        &amount_le,
        &nonce_le,
    ]);
    blake3::derive_key(blake3::contexts::PERMISSION_DIGEST, &payload)
}

/// Single-use proof that a permission was verified.
///
/// Issued by [`crate::vault::Vault::verify_permission`] after the vault nonce
/// has been advanced. `nonce` is the value the permission was signed over.
#[derive(Debug)]
pub struct Authorization {
    pub(crate) op: PermissionOp,
    pub(crate) vault: VaultId,
    pub(crate) delegate: Address,
    pub(crate) asset: AssetId,
    pub(crate) amount: u128,
    pub(crate) nonce: u64,
}

impl Authorization {
    pub fn op(&self) -> PermissionOp {
        self.op
    }

    pub fn vault(&self) -> &VaultId {
        &self.vault
    }

    pub fn delegate(&self) -> &Address {
        &self.delegate
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}
