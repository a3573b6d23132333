//! PSBT assembly, signing, and manual finalization per script type (spec
//! §4.9). Signing computes sighashes directly with `SighashCache` and
//! signs with `secp256k1` rather than pulling in a miniscript finalizer —
//! each script type's witness/scriptSig shape here is small and fixed.

use std::collections::BTreeMap;

use bitcoin::bip32::{DerivationPath, Fingerprint};
use bitcoin::ecdsa;
use bitcoin::key::{PublicKey, TapTweak};
use bitcoin::psbt::{Input as PsbtInput, Psbt};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::script::PushBytesBuf;
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::{
    Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};

use bitvault_keys::ScriptType;

use crate::error::TxError;

fn push_bytes(data: &[u8]) -> PushBytesBuf {
    PushBytesBuf::try_from(data.to_vec()).expect("redeem/witness scripts fit a single push")
}

/// Everything the PSBT builder needs to know about one input it is about
/// to spend.
#[derive(Clone)]
pub struct InputSource {
    pub txid: bitcoin::Txid,
    pub vout: u32,
    pub value: u64,
    pub script_pubkey: ScriptBuf,
    pub script_type: ScriptType,
    /// Full previous transaction, required for p2pkh (spec §4.9: "full raw
    /// prev tx — required by protocol").
    pub non_witness_utxo: Option<Transaction>,
    /// Witness script / redeem script for multisig inputs, in cosigner
    /// pubkey order.
    pub witness_script: Option<ScriptBuf>,
    /// `(fingerprint, path)` per cosigner pubkey, for multisig
    /// `bip32_derivation` entries, in the same order as `witness_script`.
    pub bip32_derivations: Vec<(PublicKey, Fingerprint, DerivationPath)>,
    /// Single-sig leaf pubkey (and its own derivation), when not multisig.
    pub leaf_pubkey: Option<PublicKey>,
    pub leaf_derivation: Option<(Fingerprint, DerivationPath)>,
    pub tap_internal_key: Option<bitcoin::XOnlyPublicKey>,
}

pub struct RecipientOutput {
    pub address: Address,
    pub value: u64,
}

/// Assemble an unsigned PSBT spending `inputs` to `recipients` plus an
/// optional change output.
pub fn create_psbt(
    inputs: &[InputSource],
    recipients: &[RecipientOutput],
    change: Option<(&Address, u64)>,
) -> Result<Psbt, TxError> {
    let tx_inputs: Vec<TxIn> = inputs
        .iter()
        .map(|i| TxIn {
            previous_output: OutPoint { txid: i.txid, vout: i.vout },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        })
        .collect();

    let mut tx_outputs: Vec<TxOut> = recipients
        .iter()
        .map(|r| TxOut { value: Amount::from_sat(r.value), script_pubkey: r.address.script_pubkey() })
        .collect();
    if let Some((addr, value)) = change {
        tx_outputs.push(TxOut { value: Amount::from_sat(value), script_pubkey: addr.script_pubkey() });
    }

    let unsigned_tx = Transaction {
        version: bitcoin::transaction::Version::TWO,
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: tx_inputs,
        output: tx_outputs,
    };

    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).map_err(|e| TxError::Psbt(e.to_string()))?;

    for (psbt_input, source) in psbt.inputs.iter_mut().zip(inputs.iter()) {
        populate_input(psbt_input, source)?;
    }

    Ok(psbt)
}

fn populate_input(psbt_input: &mut PsbtInput, source: &InputSource) -> Result<(), TxError> {
    match source.script_type {
        ScriptType::P2wpkh | ScriptType::P2shP2wpkh => {
            psbt_input.witness_utxo =
                Some(TxOut { value: Amount::from_sat(source.value), script_pubkey: source.script_pubkey.clone() });
            if source.script_type == ScriptType::P2shP2wpkh {
                if let Some(pubkey) = &source.leaf_pubkey {
                    let wpkh = pubkey.wpubkey_hash().map_err(|e| TxError::Psbt(e.to_string()))?;
                    psbt_input.redeem_script = Some(ScriptBuf::new_p2wpkh(&wpkh));
                }
            }
            if let (Some(pubkey), Some((fp, path))) = (&source.leaf_pubkey, &source.leaf_derivation) {
                psbt_input.bip32_derivation.insert(pubkey.inner, (*fp, path.clone()));
            }
        }
        ScriptType::P2pkh => {
            psbt_input.non_witness_utxo = source.non_witness_utxo.clone();
            if let (Some(pubkey), Some((fp, path))) = (&source.leaf_pubkey, &source.leaf_derivation) {
                psbt_input.bip32_derivation.insert(pubkey.inner, (*fp, path.clone()));
            }
        }
        ScriptType::P2tr => {
            psbt_input.witness_utxo =
                Some(TxOut { value: Amount::from_sat(source.value), script_pubkey: source.script_pubkey.clone() });
            psbt_input.tap_internal_key = source.tap_internal_key;
        }
        ScriptType::P2wsh | ScriptType::P2shP2wsh => {
            psbt_input.witness_utxo =
                Some(TxOut { value: Amount::from_sat(source.value), script_pubkey: source.script_pubkey.clone() });
            psbt_input.witness_script = source.witness_script.clone();
            if source.script_type == ScriptType::P2shP2wsh {
                if let Some(ws) = &source.witness_script {
                    psbt_input.redeem_script = Some(ws.to_p2wsh());
                }
            }
            for (pubkey, fp, path) in &source.bip32_derivations {
                psbt_input.bip32_derivation.insert(pubkey.inner, (*fp, path.clone()));
            }
        }
    }
    Ok(())
}

/// Sign every input this cosigner's keys cover. `keys` maps a BIP32
/// fingerprint to the matching private key. Signatures accumulate into
/// `partial_sigs`/`tap_key_sig` across repeated calls (by different
/// cosigners), so `missing_signatures` only ever decreases.
pub fn sign(
    psbt: &mut Psbt,
    inputs: &[InputSource],
    keys: &BTreeMap<Fingerprint, SecretKey>,
) -> Result<usize, TxError> {
    let secp = Secp256k1::new();
    let tx = psbt.unsigned_tx.clone();
    let mut cache = SighashCache::new(&tx);
    let all_prevouts: Vec<TxOut> = inputs
        .iter()
        .map(|i| TxOut { value: Amount::from_sat(i.value), script_pubkey: i.script_pubkey.clone() })
        .collect();

    let mut signed_count = 0usize;

    for (idx, source) in inputs.iter().enumerate() {
        match source.script_type {
            ScriptType::P2wpkh | ScriptType::P2shP2wpkh => {
                let Some((fp, _)) = source.leaf_derivation else { continue };
                let Some(sk) = keys.get(&fp) else { continue };
                let Some(pubkey) = &source.leaf_pubkey else { continue };
                let wpkh = pubkey.wpubkey_hash().map_err(|e| TxError::Psbt(e.to_string()))?;
                let script_code = ScriptBuf::new_p2wpkh(&wpkh);
                let sighash = cache
                    .p2wpkh_signature_hash(idx, &script_code, Amount::from_sat(source.value), EcdsaSighashType::All)
                    .map_err(|e| TxError::Psbt(e.to_string()))?;
                let msg = Message::from_digest(sighash.to_byte_array());
                let sig = secp.sign_ecdsa(&msg, sk);
                psbt.inputs[idx]
                    .partial_sigs
                    .insert(*pubkey, ecdsa::Signature { signature: sig, sighash_type: EcdsaSighashType::All });
                signed_count += 1;
            }
            ScriptType::P2pkh => {
                let Some((fp, _)) = source.leaf_derivation else { continue };
                let Some(sk) = keys.get(&fp) else { continue };
                let Some(pubkey) = &source.leaf_pubkey else { continue };
                let sighash = cache
                    .legacy_signature_hash(idx, &source.script_pubkey, EcdsaSighashType::All.to_u32())
                    .map_err(|e| TxError::Psbt(e.to_string()))?;
                let msg = Message::from_digest(sighash.to_byte_array());
                let sig = secp.sign_ecdsa(&msg, sk);
                psbt.inputs[idx]
                    .partial_sigs
                    .insert(*pubkey, ecdsa::Signature { signature: sig, sighash_type: EcdsaSighashType::All });
                signed_count += 1;
            }
            ScriptType::P2wsh | ScriptType::P2shP2wsh => {
                let Some(witness_script) = &source.witness_script else { continue };
                let sighash = cache
                    .segwit_v0_signature_hash(idx, witness_script, Amount::from_sat(source.value), EcdsaSighashType::All)
                    .map_err(|e| TxError::Psbt(e.to_string()))?;
                let msg = Message::from_digest(sighash.to_byte_array());
                for (pubkey, fp, _) in &source.bip32_derivations {
                    if psbt.inputs[idx].partial_sigs.contains_key(pubkey) {
                        continue;
                    }
                    if let Some(sk) = keys.get(fp) {
                        let sig = secp.sign_ecdsa(&msg, sk);
                        psbt.inputs[idx]
                            .partial_sigs
                            .insert(*pubkey, ecdsa::Signature { signature: sig, sighash_type: EcdsaSighashType::All });
                        signed_count += 1;
                    }
                }
            }
            ScriptType::P2tr => {
                let Some((fp, _)) = source.leaf_derivation else { continue };
                let Some(sk) = keys.get(&fp) else { continue };
                let prevouts = Prevouts::All(&all_prevouts);
                let sighash = cache
                    .taproot_key_spend_signature_hash(idx, &prevouts, TapSighashType::Default)
                    .map_err(|e| TxError::Psbt(e.to_string()))?;
                let keypair = bitcoin::secp256k1::Keypair::from_secret_key(&secp, sk);
                let tweaked_keypair = keypair.tap_tweak(&secp, None).to_inner();
                let msg = Message::from_digest(sighash.to_byte_array());
                let sig = secp.sign_schnorr(&msg, &tweaked_keypair);
                psbt.inputs[idx].tap_key_sig =
                    Some(bitcoin::taproot::Signature { signature: sig, sighash_type: TapSighashType::Default });
                signed_count += 1;
            }
        }
    }

    Ok(signed_count)
}

/// Number of inputs still missing enough signatures to finalize, given
/// each input's required threshold (1 for single-sig, `m` for multisig).
pub fn missing_signatures(psbt: &Psbt, thresholds: &[u8]) -> usize {
    psbt.inputs
        .iter()
        .zip(thresholds.iter())
        .filter(|(input, &m)| {
            if input.tap_key_sig.is_some() {
                false
            } else {
                (input.partial_sigs.len() as u8) < m
            }
        })
        .count()
}

/// Finalize every input, producing the final raw transaction, once every
/// input has enough signatures.
pub fn finalize(psbt: &Psbt, thresholds: &[u8]) -> Result<Transaction, TxError> {
    if missing_signatures(psbt, thresholds) > 0 {
        return Err(TxError::IncompletePsbt);
    }

    let mut tx = psbt.unsigned_tx.clone();

    for (i, input) in psbt.inputs.iter().enumerate() {
        let tx_in = &mut tx.input[i];
        if let Some(script) = &input.witness_script {
            let mut witness = Witness::new();
            witness.push(Vec::new());
            for pubkey_bytes in extract_script_pubkey_order(script) {
                if let Some((_, sig)) = input
                    .partial_sigs
                    .iter()
                    .find(|(pk, _)| pk.inner.serialize().as_slice() == pubkey_bytes.as_slice())
                {
                    witness.push(sig.to_vec());
                }
            }
            witness.push(script.to_bytes());
            if let Some(redeem) = &input.redeem_script {
                tx_in.script_sig =
                    bitcoin::blockdata::script::Builder::new().push_slice(push_bytes(redeem.as_bytes())).into_script();
            }
            tx_in.witness = witness;
        } else if let Some(tap_sig) = &input.tap_key_sig {
            tx_in.witness = Witness::p2tr_key_spend(tap_sig);
        } else if let Some((pubkey, sig)) = input.partial_sigs.iter().next() {
            match &input.redeem_script {
                Some(redeem) => {
                    tx_in.script_sig =
                        bitcoin::blockdata::script::Builder::new().push_slice(push_bytes(redeem.as_bytes())).into_script();
                    tx_in.witness = Witness::p2wpkh(sig, &bitcoin::CompressedPublicKey(pubkey.inner));
                }
                None if input.witness_utxo.is_some() => {
                    tx_in.witness = Witness::p2wpkh(sig, &bitcoin::CompressedPublicKey(pubkey.inner));
                }
                None => {
                    tx_in.script_sig = bitcoin::blockdata::script::Builder::new()
                        .push_slice(push_bytes(&sig.to_vec()))
                        .push_slice(pubkey.inner.serialize())
                        .into_script();
                }
            }
        }
    }

    Ok(tx)
}

/// Extract the pubkey byte-order encoded in a bare `OP_m <pk...> OP_n
/// OP_CHECKMULTISIG` witness script.
fn extract_script_pubkey_order(script: &ScriptBuf) -> Vec<Vec<u8>> {
    script
        .instructions()
        .filter_map(|i| i.ok())
        .filter_map(|instr| match instr {
            bitcoin::blockdata::script::Instruction::PushBytes(bytes) if bytes.len() == 33 || bytes.len() == 65 => {
                Some(bytes.as_bytes().to_vec())
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::secp256k1::{PublicKey as SecpPublicKey, Secp256k1};

    fn zero_txid() -> bitcoin::Txid {
        bitcoin::Txid::from_raw_hash(bitcoin::hashes::sha256d::Hash::all_zeros())
    }

    #[test]
    fn missing_signatures_counts_unmet_thresholds() {
        let recipients = vec![RecipientOutput {
            address: "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
                .parse::<Address<bitcoin::address::NetworkUnchecked>>()
                .unwrap()
                .assume_checked(),
            value: 10_000,
        }];
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[3u8; 32]).unwrap();
        let pk = PublicKey::new(SecpPublicKey::from_secret_key(&secp, &sk));
        let script_pubkey = ScriptBuf::new_p2wpkh(&pk.wpubkey_hash().unwrap());

        let input = InputSource {
            txid: zero_txid(),
            vout: 0,
            value: 100_000,
            script_pubkey,
            script_type: ScriptType::P2wpkh,
            non_witness_utxo: None,
            witness_script: None,
            bip32_derivations: Vec::new(),
            leaf_pubkey: Some(pk),
            leaf_derivation: None,
            tap_internal_key: None,
        };

        let psbt = create_psbt(&[input], &recipients, None).unwrap();
        assert_eq!(missing_signatures(&psbt, &[1]), 1);
    }

    #[test]
    fn signing_fills_partial_sig_and_finalize_succeeds() {
        let recipients = vec![RecipientOutput {
            address: "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
                .parse::<Address<bitcoin::address::NetworkUnchecked>>()
                .unwrap()
                .assume_checked(),
            value: 10_000,
        }];
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[7u8; 32]).unwrap();
        let pk = PublicKey::new(SecpPublicKey::from_secret_key(&secp, &sk));
        let script_pubkey = ScriptBuf::new_p2wpkh(&pk.wpubkey_hash().unwrap());
        let fp = Fingerprint::from([1, 2, 3, 4]);

        let input = InputSource {
            txid: zero_txid(),
            vout: 0,
            value: 100_000,
            script_pubkey,
            script_type: ScriptType::P2wpkh,
            non_witness_utxo: None,
            witness_script: None,
            bip32_derivations: Vec::new(),
            leaf_pubkey: Some(pk),
            leaf_derivation: Some((fp, DerivationPath::master())),
            tap_internal_key: None,
        };

        let mut psbt = create_psbt(&[input.clone()], &recipients, None).unwrap();
        let mut keys = BTreeMap::new();
        keys.insert(fp, sk);
        let signed = sign(&mut psbt, &[input], &keys).unwrap();
        assert_eq!(signed, 1);
        assert_eq!(missing_signatures(&psbt, &[1]), 0);
        let tx = finalize(&psbt, &[1]).unwrap();
        assert_eq!(tx.input.len(), 1);
        assert!(!tx.input[0].witness.is_empty());
    }
}
