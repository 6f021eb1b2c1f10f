//! # geyser-crypto
//!
//! Cryptographic primitives for the Geyser reward engine.
//!
//! Custody accounts never trust call-site identity. Every delegated token
//! movement is authorized by an Ed25519 signature from the account owner over
//! a domain-separated BLAKE3 digest, so the suite here is deliberately small.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing and identifier derivation
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032)

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
