//! Ties gap-limit discovery, Electrum fetches, and the canonical snapshot
//! database together into one per-wallet sync cycle (spec §4.7).

use std::collections::HashSet;

use bitcoin::{Address, ScriptBuf};
use bitvault_electrum::{scripthash, ElectrumClient, ElectrumError};
use rusqlite::{params, Connection};

use crate::discovery::DEFAULT_GAP_LIMIT;
use crate::error::SyncError;
use crate::materialize::{self, BalanceProjection, OwnershipView, TxDirection, UtxoView};
use crate::retry::backoff_delay;

const MAX_TRANSIENT_RETRIES: u32 = 3;

/// Derives addresses for one wallet's account without needing the private
/// key material — sync only ever needs public derivation. Implementations
/// typically wrap an `Xpub` (or, for multisig, a set of them) and a script
/// type.
pub trait AddressSource {
    fn address_at(&self, is_change: bool, index: u32) -> Result<Address, SyncError>;
}

pub struct SyncSummary {
    pub receiving_highest: Option<u32>,
    pub change_highest: Option<u32>,
    pub addresses_synced: usize,
    pub transactions_seen: usize,
    pub balance: BalanceProjection,
}

pub struct SyncEngine {
    electrum: ElectrumClient,
    gap_limit: u32,
}

impl SyncEngine {
    pub fn new(electrum: ElectrumClient) -> Self {
        Self { electrum, gap_limit: DEFAULT_GAP_LIMIT }
    }

    pub fn with_gap_limit(electrum: ElectrumClient, gap_limit: u32) -> Self {
        Self { electrum, gap_limit }
    }

    /// Run one sync cycle for a single wallet. Callers are responsible for
    /// serializing calls for the *same* wallet (spec §4.7: "sync cycles
    /// for the active wallet are serialized"); distinct wallets may sync
    /// concurrently against their own `SyncEngine`/connection.
    pub async fn sync_wallet(
        &self,
        conn: &Connection,
        wallet_id: &str,
        source: &dyn AddressSource,
    ) -> Result<SyncSummary, SyncError> {
        let receiving_highest = self.discover_chain(source, false).await?;
        let change_highest = self.discover_chain(source, true).await?;

        let mut addresses = Vec::new();
        if let Some(highest) = receiving_highest {
            for i in 0..=highest {
                addresses.push((false, i, source.address_at(false, i)?));
            }
        }
        if let Some(highest) = change_highest {
            for i in 0..=highest {
                addresses.push((true, i, source.address_at(true, i)?));
            }
        }

        for (is_change, index, address) in &addresses {
            persist_address(conn, wallet_id, *is_change, *index, address)?;
        }

        let mut all_txids: Vec<String> = Vec::new();
        for (_, _, address) in &addresses {
            let sh = scripthash(address.script_pubkey().as_bytes());
            let history = self.request_with_retry(|| self.electrum.get_history(&sh)).await?;
            if let Some(entries) = history.as_array() {
                for entry in entries {
                    if let Some(txid) = entry.get("tx_hash").and_then(|v| v.as_str()) {
                        all_txids.push(txid.to_string());
                    }
                }
            }
        }
        let txids = materialize::dedup_txids(all_txids);

        let owned_scripts: HashSet<ScriptBuf> =
            addresses.iter().map(|(_, _, addr)| addr.script_pubkey()).collect();

        for txid in &txids {
            self.materialize_transaction(conn, wallet_id, txid, &owned_scripts).await?;
        }

        let mut utxo_views = Vec::new();
        for (_, _, address) in &addresses {
            let sh = scripthash(address.script_pubkey().as_bytes());
            let unspent = self.request_with_retry(|| self.electrum.list_unspent(&sh)).await?;
            if let Some(entries) = unspent.as_array() {
                for entry in entries {
                    let value = entry.get("value").and_then(|v| v.as_u64()).unwrap_or(0);
                    let height = entry.get("height").and_then(|v| v.as_i64()).unwrap_or(0);
                    let confirmations = if height > 0 { 1 } else { 0 };
                    utxo_views.push(UtxoView { value, confirmations });
                    persist_utxo(conn, wallet_id, entry, address)?;
                }
            }
        }
        let balance = materialize::project_balance(&utxo_views);

        conn.execute(
            "INSERT INTO wallets(id, record_json, updated_at) VALUES (?1, '{}', 0)
             ON CONFLICT(id) DO NOTHING",
            params![wallet_id],
        )?;

        Ok(SyncSummary {
            receiving_highest,
            change_highest,
            addresses_synced: addresses.len(),
            transactions_seen: txids.len(),
            balance,
        })
    }

    /// Async counterpart to [`crate::discovery::discover_highest_used_index`]:
    /// same window-based termination rule, driven by real network lookups
    /// instead of a synchronous probe closure.
    async fn discover_chain(&self, source: &dyn AddressSource, is_change: bool) -> Result<Option<u32>, SyncError> {
        let mut highest_hit: Option<u32> = None;
        let mut window_start: u32 = 0;

        loop {
            let mut hit_in_window = false;
            for i in window_start..window_start + self.gap_limit {
                let address = source.address_at(is_change, i)?;
                let sh = scripthash(address.script_pubkey().as_bytes());
                let history = self.request_with_retry(|| self.electrum.get_history(&sh)).await?;
                let has_history = history.as_array().map(|a| !a.is_empty()).unwrap_or(false);
                if has_history {
                    highest_hit = Some(i);
                    hit_in_window = true;
                }
            }
            if !hit_in_window {
                break;
            }
            window_start = highest_hit.expect("hit_in_window implies highest_hit is set") + 1;
        }

        Ok(highest_hit)
    }

    async fn request_with_retry<F, Fut>(&self, f: F) -> Result<serde_json::Value, SyncError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<serde_json::Value, ElectrumError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(ElectrumError::RequestTimeout(_)) | Err(ElectrumError::ServerUnreachable(_))
                    if attempt < MAX_TRANSIENT_RETRIES =>
                {
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(SyncError::from(e)),
            }
        }
    }

    async fn materialize_transaction(
        &self,
        conn: &Connection,
        wallet_id: &str,
        txid: &str,
        owned_scripts: &HashSet<ScriptBuf>,
    ) -> Result<(), SyncError> {
        let raw = self.request_with_retry(|| self.electrum.get_transaction(txid, false)).await?;
        let Some(hex_str) = raw.as_str() else {
            return Err(SyncError::Internal(format!("transaction {txid} returned no raw hex")));
        };
        let bytes = hex::decode(hex_str)
            .map_err(|e| SyncError::Internal(format!("invalid tx hex for {txid}: {e}")))?;
        let tx: bitcoin::Transaction = bitcoin::consensus::deserialize(&bytes)
            .map_err(|e| SyncError::Internal(format!("failed to decode transaction {txid}: {e}")))?;

        let mut owned_output_value = 0u64;
        let mut owned_output_count = 0usize;
        for out in &tx.output {
            if owned_scripts.contains(&out.script_pubkey) {
                owned_output_value += out.value.to_sat();
                owned_output_count += 1;
            }
        }

        let mut owned_input_value = 0u64;
        let mut owned_input_count = 0usize;
        for input in &tx.input {
            let prev_txid = input.previous_output.txid.to_string();
            let prev_vout = input.previous_output.vout;
            let stored: Option<(i64, String)> = conn
                .query_row(
                    "SELECT value, script_pubkey FROM utxos WHERE wallet_id = ?1 AND txid = ?2 AND vout = ?3",
                    params![wallet_id, prev_txid, prev_vout],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .ok();
            if let Some((value, _script)) = stored {
                owned_input_value += value as u64;
                owned_input_count += 1;
            }
        }

        let view = OwnershipView {
            owned_input_value,
            owned_output_value,
            total_input_count: tx.input.len(),
            owned_input_count,
            total_output_count: tx.output.len(),
            owned_output_count,
        };
        let direction = materialize::classify_direction(&view);
        let diff = materialize::balance_diff(&view);

        let tx_type = match direction {
            TxDirection::Incoming => "incoming",
            TxDirection::Outgoing => "outgoing",
            TxDirection::SelfTransfer => "self_transfer",
        };

        conn.execute(
            "INSERT INTO transactions(wallet_id, txid, height, balance_diff, tx_type, raw_hex, first_seen)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5, NULL)
             ON CONFLICT(wallet_id, txid) DO UPDATE SET
                balance_diff = excluded.balance_diff,
                tx_type = excluded.tx_type,
                raw_hex = excluded.raw_hex",
            params![wallet_id, txid, diff, tx_type, hex_str],
        )?;

        Ok(())
    }
}

fn persist_address(
    conn: &Connection,
    wallet_id: &str,
    is_change: bool,
    index: u32,
    address: &Address,
) -> Result<(), SyncError> {
    let sh = scripthash(address.script_pubkey().as_bytes());
    let path = format!("{}/{}", if is_change { 1 } else { 0 }, index);
    conn.execute(
        "INSERT INTO addresses(wallet_id, address, path, chain_index, is_change, scripthash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(wallet_id, address) DO NOTHING",
        params![wallet_id, address.to_string(), path, index, is_change as i64, sh],
    )?;
    Ok(())
}

fn persist_utxo(
    conn: &Connection,
    wallet_id: &str,
    entry: &serde_json::Value,
    address: &Address,
) -> Result<(), SyncError> {
    let txid = entry.get("tx_hash").and_then(|v| v.as_str()).unwrap_or_default();
    let vout = entry.get("tx_pos").and_then(|v| v.as_u64()).unwrap_or(0);
    let value = entry.get("value").and_then(|v| v.as_u64()).unwrap_or(0);
    let height = entry.get("height").and_then(|v| v.as_i64()).unwrap_or(0);
    let confirmations = if height > 0 { 1 } else { 0 };
    let script_pubkey_hex = hex::encode(address.script_pubkey().as_bytes());

    conn.execute(
        "INSERT INTO utxos(wallet_id, txid, vout, value, address, script_pubkey, confirmations)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(wallet_id, txid, vout) DO UPDATE SET confirmations = excluded.confirmations",
        params![wallet_id, txid, vout, value as i64, address.to_string(), script_pubkey_hex, confirmations],
    )?;
    Ok(())
}
