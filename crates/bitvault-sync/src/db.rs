//! The canonical snapshot database: wallets, addresses, utxos,
//! transactions, and a generic `app_config` key-value table (spec §6.4).
//! Migrations are forward-only and each runs inside its own transaction.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::SyncError;

const SCHEMA_VERSION: i64 = 1;

pub fn open(path: &Path) -> Result<Connection, SyncError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, SyncError> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(conn)
}

fn current_version(conn: &Connection) -> Result<i64, SyncError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(SyncError::from)
}

fn set_version(conn: &Connection, version: i64) -> Result<(), SyncError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<(), SyncError> {
    let mut version = current_version(conn)?;
    if version < 1 {
        migrate_v1(conn)?;
        version = 1;
        set_version(conn, version)?;
    }
    debug_assert_eq!(version, SCHEMA_VERSION);
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), SyncError> {
    conn.execute_batch(
        "
        BEGIN;

        CREATE TABLE IF NOT EXISTS wallets (
            id TEXT PRIMARY KEY,
            record_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS addresses (
            wallet_id TEXT NOT NULL,
            address TEXT NOT NULL,
            path TEXT NOT NULL,
            chain_index INTEGER NOT NULL,
            is_change INTEGER NOT NULL,
            scripthash TEXT NOT NULL,
            PRIMARY KEY (wallet_id, address)
        );

        CREATE INDEX IF NOT EXISTS idx_addresses_scripthash ON addresses(scripthash);

        CREATE TABLE IF NOT EXISTS utxos (
            wallet_id TEXT NOT NULL,
            txid TEXT NOT NULL,
            vout INTEGER NOT NULL,
            value INTEGER NOT NULL,
            address TEXT NOT NULL,
            script_pubkey TEXT NOT NULL,
            confirmations INTEGER NOT NULL,
            is_frozen INTEGER NOT NULL DEFAULT 0,
            is_locked INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (wallet_id, txid, vout)
        );

        CREATE TABLE IF NOT EXISTS transactions (
            wallet_id TEXT NOT NULL,
            txid TEXT NOT NULL,
            height INTEGER,
            balance_diff INTEGER NOT NULL,
            tx_type TEXT NOT NULL,
            raw_hex TEXT,
            first_seen INTEGER,
            PRIMARY KEY (wallet_id, txid)
        );

        CREATE TABLE IF NOT EXISTS app_config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        COMMIT;
        ",
    )?;
    Ok(())
}

pub fn put_config(conn: &Connection, key: &str, value: &str) -> Result<(), SyncError> {
    conn.execute(
        "INSERT INTO app_config(key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, SyncError> {
    conn.query_row("SELECT value FROM app_config WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .map(Some)
    .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e.into()) })
}

/// Wipe every wallet-scoped table, leaving `app_config` (and anything the
/// caller keeps outside this DB, like the server-reputation cache) alone.
pub fn wipe_all_wallets(conn: &Connection) -> Result<(), SyncError> {
    conn.execute_batch(
        "
        DELETE FROM wallets;
        DELETE FROM addresses;
        DELETE FROM utxos;
        DELETE FROM transactions;
        ",
    )?;
    Ok(())
}

pub fn wipe_wallet(conn: &Connection, wallet_id: &str) -> Result<(), SyncError> {
    conn.execute("DELETE FROM wallets WHERE id = ?1", params![wallet_id])?;
    conn.execute("DELETE FROM addresses WHERE wallet_id = ?1", params![wallet_id])?;
    conn.execute("DELETE FROM utxos WHERE wallet_id = ?1", params![wallet_id])?;
    conn.execute("DELETE FROM transactions WHERE wallet_id = ?1", params![wallet_id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_db_is_at_current_schema_version() {
        let conn = open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migration_is_idempotent_on_reopen() {
        let conn = open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn config_roundtrips_and_upserts() {
        let conn = open_in_memory().unwrap();
        put_config(&conn, "gap_limit", "20").unwrap();
        assert_eq!(get_config(&conn, "gap_limit").unwrap(), Some("20".to_string()));
        put_config(&conn, "gap_limit", "40").unwrap();
        assert_eq!(get_config(&conn, "gap_limit").unwrap(), Some("40".to_string()));
    }

    #[test]
    fn missing_config_key_is_none() {
        let conn = open_in_memory().unwrap();
        assert_eq!(get_config(&conn, "nope").unwrap(), None);
    }

    #[test]
    fn wipe_wallet_only_clears_that_wallet() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO wallets(id, record_json, updated_at) VALUES ('w1', '{}', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO wallets(id, record_json, updated_at) VALUES ('w2', '{}', 0)",
            [],
        )
        .unwrap();
        wipe_wallet(&conn, "w1").unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM wallets", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
