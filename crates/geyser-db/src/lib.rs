//! # geyser-db
//!
//! Persistence for the Geyser daemon.
//! Manages the single SQLite database at `$GEYSER_DATA_DIR/geyser.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Token amounts and shares are stored as decimal text (u128)
//! - Schema version stored in `PRAGMA user_version`
//!
//! Pools and vaults are stored as JSON snapshots; reward schedules and
//! settlement records form an append-only log.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the Geyser database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Parse a decimal-text amount column.
pub(crate) fn parse_amount(text: &str) -> Result<u128> {
    text.parse::<u128>()
        .map_err(|e| DbError::Corrupt(format!("amount {text:?}: {e}")))
}

/// Read a 32-byte id from a BLOB column.
pub(crate) fn id32(bytes: Vec<u8>) -> Result<[u8; 32]> {
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| DbError::Corrupt(format!("expected 32-byte id, got {len} bytes")))
}
