//! M-of-N multisig redeem script construction and address derivation
//! (spec §4.4 "p2wsh multisig").

use bitcoin::blockdata::opcodes::all::OP_CHECKMULTISIG;
use bitcoin::blockdata::script::Builder;
use bitcoin::{Address, Network, PublicKey, ScriptBuf};

use crate::error::KeyError;
use crate::script_type::ScriptType;

/// Sort compressed public keys lexicographically by their serialized
/// bytes (BIP67), as required for `sortedmulti` descriptors.
pub fn sort_pubkeys_lexicographic(pubkeys: &mut [PublicKey]) {
    pubkeys.sort_by(|a, b| a.to_bytes().cmp(&b.to_bytes()));
}

/// Build the bare multisig redeem/witness script:
/// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG`.
///
/// `pubkeys` must already be in the desired order — sort first with
/// [`sort_pubkeys_lexicographic`] for `sortedmulti` semantics.
pub fn redeem_script(m: u8, pubkeys: &[PublicKey]) -> Result<ScriptBuf, KeyError> {
    let n = pubkeys.len();
    if m == 0 || (n as u8) < m || n > 15 {
        return Err(KeyError::InvalidMultisig(format!(
            "invalid m-of-n: {m}-of-{n}"
        )));
    }

    let mut builder = Builder::new().push_int(m as i64);
    for pk in pubkeys {
        builder = builder.push_key(pk);
    }
    builder = builder.push_int(n as i64).push_opcode(OP_CHECKMULTISIG);
    Ok(builder.into_script())
}

/// Derive the address for a multisig redeem script under the requested
/// wrapping (`P2wsh` = native segwit v0, `P2shP2wsh` = nested).
pub fn multisig_address(
    witness_script: &ScriptBuf,
    script_type: ScriptType,
    network: Network,
) -> Result<(Address, ScriptBuf), KeyError> {
    match script_type {
        ScriptType::P2wsh => {
            let addr = Address::p2wsh(witness_script, network);
            Ok((addr, witness_script.clone()))
        }
        ScriptType::P2shP2wsh => {
            let p2wsh_spk = witness_script.to_p2wsh();
            let addr = Address::p2sh(&p2wsh_spk, network)
                .map_err(|e| KeyError::AddressFailed(e.to_string()))?;
            Ok((addr, witness_script.clone()))
        }
        other => Err(KeyError::InvalidMultisig(format!(
            "{other} is not a multisig script type"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::{PublicKey as SecpPublicKey, Secp256k1, SecretKey};

    fn test_pubkeys(n: usize) -> Vec<PublicKey> {
        let secp = Secp256k1::new();
        (1..=n as u8)
            .map(|i| {
                let sk = SecretKey::from_slice(&[i; 32]).unwrap();
                let secp_pk = SecpPublicKey::from_secret_key(&secp, &sk);
                PublicKey::new(secp_pk)
            })
            .collect()
    }

    #[test]
    fn two_of_three_redeem_script_builds() {
        let pubkeys = test_pubkeys(3);
        let script = redeem_script(2, &pubkeys).unwrap();
        assert!(!script.is_empty());
    }

    #[test]
    fn invalid_threshold_rejected() {
        let pubkeys = test_pubkeys(3);
        assert!(redeem_script(0, &pubkeys).is_err());
        assert!(redeem_script(4, &pubkeys).is_err());
    }

    #[test]
    fn p2wsh_address_starts_with_bc1q() {
        let pubkeys = test_pubkeys(3);
        let script = redeem_script(2, &pubkeys).unwrap();
        let (addr, _) = multisig_address(&script, ScriptType::P2wsh, Network::Bitcoin).unwrap();
        assert!(addr.to_string().starts_with("bc1q"));
    }

    #[test]
    fn p2sh_p2wsh_address_starts_with_3() {
        let pubkeys = test_pubkeys(3);
        let script = redeem_script(2, &pubkeys).unwrap();
        let (addr, _) =
            multisig_address(&script, ScriptType::P2shP2wsh, Network::Bitcoin).unwrap();
        assert!(addr.to_string().starts_with('3'));
    }

    #[test]
    fn sorting_is_deterministic_regardless_of_input_order() {
        let mut a = test_pubkeys(3);
        let mut b = test_pubkeys(3);
        b.reverse();
        sort_pubkeys_lexicographic(&mut a);
        sort_pubkeys_lexicographic(&mut b);
        assert_eq!(a, b);
    }
}
