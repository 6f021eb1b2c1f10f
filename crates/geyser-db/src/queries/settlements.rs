//! Append-only settlement log.

use geyser_types::events::SettlementRecord;
use geyser_types::{PoolId, VaultId};
use rusqlite::Connection;

use crate::Result;

/// Append a settlement record.
pub fn append_settlement(conn: &Connection, record: &SettlementRecord) -> Result<()> {
    let body = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO settlements (record_id, pool_id, kind, vault_id, record, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            record.id.as_slice(),
            record.pool.as_slice(),
            record.kind.name(),
            record.kind.vault().map(|v| v.to_vec()),
            body,
            record.timestamp as i64,
        ],
    )?;
    Ok(())
}

/// Most recent records of a pool, newest first.
pub fn recent_settlements(
    conn: &Connection,
    pool_id: &PoolId,
    limit: u32,
) -> Result<Vec<SettlementRecord>> {
    let mut stmt = conn.prepare(
        "SELECT record FROM settlements WHERE pool_id = ?1
         ORDER BY seq DESC LIMIT ?2",
    )?;
    let bodies = stmt
        .query_map(rusqlite::params![pool_id.as_slice(), limit], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    decode(&bodies)
}

/// Every record that touched `vault_id`, oldest first.
pub fn settlements_for_vault(
    conn: &Connection,
    vault_id: &VaultId,
) -> Result<Vec<SettlementRecord>> {
    let mut stmt =
        conn.prepare("SELECT record FROM settlements WHERE vault_id = ?1 ORDER BY seq ASC")?;
    let bodies = stmt
        .query_map([vault_id.as_slice()], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    decode(&bodies)
}

/// The whole log of a pool, oldest first.
pub fn all_settlements(conn: &Connection, pool_id: &PoolId) -> Result<Vec<SettlementRecord>> {
    let mut stmt =
        conn.prepare("SELECT record FROM settlements WHERE pool_id = ?1 ORDER BY seq ASC")?;
    let bodies = stmt
        .query_map([pool_id.as_slice()], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    decode(&bodies)
}

/// Number of stored records of a pool.
pub fn count_settlements(conn: &Connection, pool_id: &PoolId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM settlements WHERE pool_id = ?1",
        [pool_id.as_slice()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn decode(bodies: &[String]) -> Result<Vec<SettlementRecord>> {
    bodies
        .iter()
        .map(|b| serde_json::from_str(b).map_err(Into::into))
        .collect()
}
