//! Ed25519 signing and verification (RFC 8032).
//!
//! Ed25519 is the only signature scheme in Geyser. It is used for:
//! - Custody account ownership (the vault owner key)
//! - Lock and unlock permissions granted to a staking delegate
//!
//! This module wraps `ed25519-dalek` with Geyser-specific types.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{CryptoError, Result};

/// An Ed25519 signing key (private key).
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&self.inner.to_bytes()),
        }
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

/// An Ed25519 verification key (public key).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

/// An Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

/// An Ed25519 keypair owning a custody account.
pub struct KeyPair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a signing key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(bytes),
        }
    }

    /// Get the raw bytes of this signing key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the corresponding verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.inner.sign(message),
        }
    }
}

impl VerifyingKey {
    /// Create a verifying key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parse a verifying key from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Self::from_bytes(&arr)
    }

    /// Get the raw bytes of this verifying key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the raw bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }

    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.inner
            .verify(message, &signature.inner)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self {
            inner: ed25519_dalek::Signature::from_bytes(bytes),
        }
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        let arr: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 64,
                actual: bytes.len(),
            })?;
        Ok(Self::from_bytes(&arr))
    }

    /// Get the raw bytes of this signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

impl KeyPair {
    /// Generate a new random Ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate();
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create a keypair from a signing key's raw bytes.
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// The account address controlled by this keypair.
    pub fn address(&self) -> [u8; 32] {
        derive_address(&self.verifying_key)
    }
}

/// Derive an account address from a public key.
///
/// `address = BLAKE3::hash(public_key)`
pub fn derive_address(public_key: &VerifyingKey) -> [u8; 32] {
    crate::blake3::hash(public_key.as_bytes())
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public", &self.verifying_key())
            .finish()
    }
}
