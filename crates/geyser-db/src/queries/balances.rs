//! Token balance book.

use geyser_vault::ledger::TokenLedger;
use rusqlite::Connection;

use crate::{id32, parse_amount, Result};

/// Replace the stored balance book with `ledger`.
///
/// Call inside a transaction so the book is never observed half-written.
pub fn save_ledger(conn: &Connection, ledger: &TokenLedger) -> Result<()> {
    conn.execute("DELETE FROM ledger_balances", [])?;
    let mut stmt = conn.prepare(
        "INSERT INTO ledger_balances (asset, holder, amount) VALUES (?1, ?2, ?3)",
    )?;
    for (asset, holder, amount) in ledger.entries() {
        stmt.execute(rusqlite::params![
            asset.as_slice(),
            holder.as_slice(),
            amount.to_string()
        ])?;
    }
    Ok(())
}

/// Load the stored balance book.
pub fn load_ledger(conn: &Connection) -> Result<TokenLedger> {
    let mut stmt = conn.prepare("SELECT asset, holder, amount FROM ledger_balances")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (asset, holder, amount) in rows {
        entries.push((id32(asset)?, id32(holder)?, parse_amount(&amount)?));
    }
    Ok(TokenLedger::from_entries(entries))
}
