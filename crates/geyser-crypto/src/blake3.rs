//! Domain-separated BLAKE3 hashing for Geyser.
//!
//! Identifiers (vaults, pools, assets) and permission digests are all derived
//! with BLAKE3. Cross-domain collisions are prevented by mandatory domain
//! separation through BLAKE3's key derivation mode.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: account addresses
//! - [`derive_key`] — Domain-separated derivation: identifiers and digests

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const PERMISSION_DIGEST: &str = "Geyser v1 permission-digest";
    pub const VAULT_ID: &str = "Geyser v1 vault-id";
    pub const POOL_ID: &str = "Geyser v1 pool-id";
    pub const ASSET_ID: &str = "Geyser v1 asset-id";
    pub const SETTLEMENT_ID: &str = "Geyser v1 settlement-id";
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte value using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "Geyser v1 ")
/// * `key_material` - The input material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
