//! Pool snapshots.

use geyser_engine::Pool;
use geyser_types::PoolId;
use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// Insert or replace a pool snapshot.
pub fn save_pool(conn: &Connection, pool: &Pool, updated_at: u64) -> Result<()> {
    let snapshot = serde_json::to_string(pool)?;
    conn.execute(
        "INSERT INTO pools (pool_id, snapshot, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(pool_id) DO UPDATE SET snapshot = excluded.snapshot,
                                            updated_at = excluded.updated_at",
        rusqlite::params![pool.id.as_slice(), snapshot, updated_at as i64],
    )?;
    Ok(())
}

/// Load a pool snapshot by id.
pub fn load_pool(conn: &Connection, pool_id: &PoolId) -> Result<Option<Pool>> {
    let snapshot: Option<String> = conn
        .query_row(
            "SELECT snapshot FROM pools WHERE pool_id = ?1",
            [pool_id.as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    snapshot.as_deref().map(decode).transpose()
}

/// Load every pool, most recently updated first.
pub fn load_pools(conn: &Connection) -> Result<Vec<Pool>> {
    let mut stmt = conn.prepare("SELECT snapshot FROM pools ORDER BY updated_at DESC")?;
    let snapshots = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    snapshots.iter().map(|s| decode(s)).collect()
}

fn decode(snapshot: &str) -> Result<Pool> {
    let pool: Pool = serde_json::from_str(snapshot)?;
    pool.scaling
        .validate()
        .map_err(|e| DbError::Corrupt(format!("pool {}: {e}", hex::encode(&pool.id[..4]))))?;
    Ok(pool)
}
