//! Transaction materialization and balance projection (spec §4.7 steps
//! 3-4).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxDirection {
    Incoming,
    Outgoing,
    SelfTransfer,
}

/// A minimal view of a decoded transaction sufficient to classify
/// ownership and compute the wallet-relative balance delta. `owned_inputs`
/// and `owned_outputs` are values already known to belong to this wallet
/// (resolved by linking prevouts against the address cache).
pub struct OwnershipView {
    pub owned_input_value: u64,
    pub owned_output_value: u64,
    pub total_input_count: usize,
    pub owned_input_count: usize,
    pub total_output_count: usize,
    pub owned_output_count: usize,
}

/// `balanceDiff = credited outputs - spent owned inputs` (spec §4.7.3).
pub fn balance_diff(view: &OwnershipView) -> i64 {
    view.owned_output_value as i64 - view.owned_input_value as i64
}

/// Classify a transaction as incoming/outgoing/self-transfer by
/// input/output ownership intersection.
pub fn classify_direction(view: &OwnershipView) -> TxDirection {
    let spends_own_inputs = view.owned_input_count > 0;
    let all_inputs_owned = view.owned_input_count == view.total_input_count && view.total_input_count > 0;
    let all_outputs_owned = view.owned_output_count == view.total_output_count && view.total_output_count > 0;

    if spends_own_inputs && all_inputs_owned && all_outputs_owned {
        TxDirection::SelfTransfer
    } else if spends_own_inputs {
        TxDirection::Outgoing
    } else {
        TxDirection::Incoming
    }
}

/// Deduplicate a batch of txids fetched from possibly-overlapping
/// scripthash histories, preserving first-seen order.
pub fn dedup_txids(txids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for txid in txids {
        if seen.insert(txid.clone()) {
            out.push(txid);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceProjection {
    pub confirmed: u64,
    pub unconfirmed: u64,
}

pub struct UtxoView {
    pub value: u64,
    pub confirmations: u32,
}

/// confirmed = sum over UTXOs with confirmations >= 1; unconfirmed = sum
/// over mempool (0 confirmations) (spec §4.7.4).
pub fn project_balance(utxos: &[UtxoView]) -> BalanceProjection {
    let mut projection = BalanceProjection::default();
    for utxo in utxos {
        if utxo.confirmations >= 1 {
            projection.confirmed += utxo.value;
        } else {
            projection.unconfirmed += utxo.value;
        }
    }
    projection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_tx_has_no_owned_inputs() {
        let view = OwnershipView {
            owned_input_value: 0,
            owned_output_value: 50_000,
            total_input_count: 1,
            owned_input_count: 0,
            total_output_count: 1,
            owned_output_count: 1,
        };
        assert_eq!(classify_direction(&view), TxDirection::Incoming);
        assert_eq!(balance_diff(&view), 50_000);
    }

    #[test]
    fn outgoing_tx_spends_owned_input_to_external_output() {
        let view = OwnershipView {
            owned_input_value: 100_000,
            owned_output_value: 40_000,
            total_input_count: 1,
            owned_input_count: 1,
            total_output_count: 2,
            owned_output_count: 1,
        };
        assert_eq!(classify_direction(&view), TxDirection::Outgoing);
        assert_eq!(balance_diff(&view), -60_000);
    }

    #[test]
    fn self_transfer_owns_all_inputs_and_outputs() {
        let view = OwnershipView {
            owned_input_value: 100_000,
            owned_output_value: 99_000,
            total_input_count: 1,
            owned_input_count: 1,
            total_output_count: 1,
            owned_output_count: 1,
        };
        assert_eq!(classify_direction(&view), TxDirection::SelfTransfer);
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let txids = vec!["a".to_string(), "b".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(dedup_txids(txids), vec!["a", "b", "c"]);
    }

    #[test]
    fn balance_projection_splits_by_confirmation() {
        let utxos = vec![
            UtxoView { value: 1000, confirmations: 0 },
            UtxoView { value: 2000, confirmations: 1 },
            UtxoView { value: 3000, confirmations: 6 },
        ];
        let projection = project_balance(&utxos);
        assert_eq!(projection.unconfirmed, 1000);
        assert_eq!(projection.confirmed, 5000);
    }
}
