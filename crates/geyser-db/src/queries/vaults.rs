//! Vault snapshots.

use geyser_types::VaultId;
use geyser_vault::vault::Vault;
use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Insert or replace a vault snapshot.
pub fn save_vault(conn: &Connection, vault: &Vault, updated_at: u64) -> Result<()> {
    let snapshot = serde_json::to_string(vault)?;
    let owner = vault.owner_address();
    conn.execute(
        "INSERT INTO vaults (vault_id, owner, snapshot, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(vault_id) DO UPDATE SET snapshot = excluded.snapshot,
                                             updated_at = excluded.updated_at",
        rusqlite::params![
            vault.id.as_slice(),
            owner.as_slice(),
            snapshot,
            updated_at as i64
        ],
    )?;
    Ok(())
}

/// Load a vault by id.
pub fn load_vault(conn: &Connection, vault_id: &VaultId) -> Result<Option<Vault>> {
    let snapshot: Option<String> = conn
        .query_row(
            "SELECT snapshot FROM vaults WHERE vault_id = ?1",
            [vault_id.as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    snapshot
        .map(|s| serde_json::from_str(&s).map_err(Into::into))
        .transpose()
}

/// Load every vault.
pub fn load_vaults(conn: &Connection) -> Result<Vec<Vault>> {
    let mut stmt = conn.prepare("SELECT snapshot FROM vaults")?;
    let snapshots = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    snapshots
        .iter()
        .map(|s| serde_json::from_str(s).map_err(Into::into))
        .collect()
}

/// Ids of the vaults owned by `owner`.
pub fn vaults_of_owner(conn: &Connection, owner: &[u8; 32]) -> Result<Vec<VaultId>> {
    let mut stmt = conn.prepare("SELECT vault_id FROM vaults WHERE owner = ?1")?;
    let ids = stmt
        .query_map([owner.as_slice()], |row| row.get::<_, Vec<u8>>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    ids.into_iter().map(crate::id32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geyser_crypto::ed25519::KeyPair;

    #[test]
    fn test_save_and_load() {
        let conn = crate::open_memory().expect("open");
        let owner = KeyPair::from_bytes(&[3; 32]);
        let mut vault = Vault::create(owner.verifying_key.clone(), b"a");
        vault.nonce = 4;
        save_vault(&conn, &vault, 10).expect("save");

        assert_eq!(load_vault(&conn, &vault.id).expect("load"), Some(vault.clone()));
        assert_eq!(
            vaults_of_owner(&conn, &owner.address()).expect("by owner"),
            vec![vault.id]
        );
    }

    #[test]
    fn test_load_all() {
        let conn = crate::open_memory().expect("open");
        let owner = KeyPair::from_bytes(&[3; 32]);
        for salt in [b"a", b"b", b"c"] {
            let vault = Vault::create(owner.verifying_key.clone(), salt);
            save_vault(&conn, &vault, 1).expect("save");
        }
        assert_eq!(load_vaults(&conn).expect("load").len(), 3);
    }
}
