//! SQL schema definitions.

/// Complete schema for the Geyser v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Engine state snapshots
-- ============================================================

CREATE TABLE IF NOT EXISTS pools (
    pool_id BLOB PRIMARY KEY,
    snapshot TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS vaults (
    vault_id BLOB PRIMARY KEY,
    owner BLOB NOT NULL,
    snapshot TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vaults_owner ON vaults(owner);

-- ============================================================
-- Token balance book
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_balances (
    asset BLOB NOT NULL,
    holder BLOB NOT NULL,
    amount TEXT NOT NULL,
    PRIMARY KEY (asset, holder)
);

-- ============================================================
-- Append-only log
-- ============================================================

CREATE TABLE IF NOT EXISTS reward_schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pool_id BLOB NOT NULL REFERENCES pools(pool_id),
    start INTEGER NOT NULL,
    duration INTEGER NOT NULL,
    shares TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_schedules_pool ON reward_schedules(pool_id);

CREATE TABLE IF NOT EXISTS settlements (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id BLOB NOT NULL UNIQUE,
    pool_id BLOB NOT NULL REFERENCES pools(pool_id),
    kind TEXT NOT NULL,
    vault_id BLOB,
    record TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_settlements_pool ON settlements(pool_id);
CREATE INDEX IF NOT EXISTS idx_settlements_vault ON settlements(vault_id);
"#;
