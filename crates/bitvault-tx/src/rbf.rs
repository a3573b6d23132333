//! Fee bumping: RBF (BIP125) replacement and CPFP child-pays-for-parent
//! (spec §4.9).

use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut};

use crate::error::TxError;

/// Whether `tx` signals replaceability per BIP125 (any input sequence <
/// `0xfffffffe`).
pub fn signals_rbf(tx: &Transaction) -> bool {
    tx.input.iter().any(|i| i.sequence.0 < 0xffff_fffe)
}

/// Build a fee-bumped replacement of `original`: same inputs (at least
/// one of the original's, per BIP125), same recipients, a strictly higher
/// total fee, RBF-enabled sequence numbers, and the shortfall taken from
/// the change output.
pub fn bump_fee(
    original: &Transaction,
    original_input_values: &[u64],
    change_output_index: Option<usize>,
    new_fee: u64,
) -> Result<Transaction, TxError> {
    if !signals_rbf(original) {
        return Err(TxError::NotReplaceable);
    }

    let total_in: u64 = original_input_values.iter().sum();
    let total_out_original: u64 = original.output.iter().map(|o| o.value.to_sat()).sum();
    let original_fee = total_in.saturating_sub(total_out_original);

    if new_fee <= original_fee {
        return Err(TxError::FeeNotIncreased);
    }

    let extra_fee = new_fee - original_fee;
    let mut replacement = original.clone();
    for input in &mut replacement.input {
        input.sequence = Sequence::ENABLE_RBF_NO_LOCKTIME;
    }

    match change_output_index {
        Some(idx) if idx < replacement.output.len() => {
            let change = &mut replacement.output[idx];
            let new_value = change.value.to_sat().checked_sub(extra_fee).ok_or(TxError::InsufficientFunds)?;
            change.value = Amount::from_sat(new_value);
        }
        _ => {
            // No change output to absorb the bump: the caller must have
            // already re-run UtxoSelector with the new fee rate and handed
            // us a transaction whose outputs already net out correctly.
            if total_in < total_out_original + extra_fee {
                return Err(TxError::InsufficientFunds);
            }
        }
    }

    Ok(replacement)
}

/// Build a CPFP child spending `parent_txid:parent_vout` (a UTXO the
/// wallet owns) to `sweep_address`, sized so the child+parent package fee
/// rate reaches `target_fee_rate_per_vb`.
pub fn bump_child(
    parent_txid: bitcoin::Txid,
    parent_vout: u32,
    parent_output_value: u64,
    parent_vsize: u64,
    parent_fee_paid: u64,
    already_spent: bool,
    sweep_script_pubkey: ScriptBuf,
    child_vsize_estimate: u64,
    target_fee_rate_per_vb: f64,
    dust_threshold: u64,
) -> Result<Transaction, TxError> {
    if already_spent {
        return Err(TxError::InvalidCpfpTarget);
    }

    let package_vsize = parent_vsize + child_vsize_estimate;
    let target_package_fee = (package_vsize as f64 * target_fee_rate_per_vb).ceil() as u64;
    let child_fee = target_package_fee.saturating_sub(parent_fee_paid);

    let child_value = parent_output_value.checked_sub(child_fee).ok_or(TxError::InvalidCpfpTarget)?;
    if child_value < dust_threshold {
        return Err(TxError::InvalidCpfpTarget);
    }

    let tx = Transaction {
        version: bitcoin::transaction::Version::TWO,
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint { txid: parent_txid, vout: parent_vout },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: bitcoin::Witness::new(),
        }],
        output: vec![TxOut { value: Amount::from_sat(child_value), script_pubkey: sweep_script_pubkey }],
    };

    Ok(tx)
}
