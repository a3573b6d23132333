//! BIP32 master/account/address derivation and address materialization.

use bitcoin::bip32::{Fingerprint, Xpriv, Xpub};
use bitcoin::key::{CompressedPublicKey, TapTweak};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network};
use zeroize::Zeroizing;

use crate::error::KeyError;
use crate::script_type::{account_path, chain_index_path, DerivationPreset, ScriptType};

/// Derive the 64-byte BIP39 seed from a mnemonic and optional passphrase.
pub fn seed_from_mnemonic(mnemonic: &bip39::Mnemonic, passphrase: &str) -> Zeroizing<[u8; 64]> {
    Zeroizing::new(mnemonic.to_seed(passphrase))
}

/// Derive the master extended private key from a seed (mainnet only —
/// this core does not support testnet, spec §1).
pub fn master_xpriv(seed: &[u8; 64]) -> Result<Xpriv, KeyError> {
    Xpriv::new_master(Network::Bitcoin, seed).map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// Derive the account-level xpriv for a given preset/account index.
///
/// For `DerivationPreset::Bip48`, `script_type` must be
/// `P2wsh`/`P2shP2wsh` and the returned path includes the BIP48
/// script-type component; for all other presets `script_type` is ignored
/// here (callers pick it independently via
/// [`DerivationPreset::natural_script_type`] or an explicit override).
pub fn account_xpriv(
    master: &Xpriv,
    preset: DerivationPreset,
    account_index: u32,
    custom_path: Option<&str>,
    script_type_for_bip48: Option<ScriptType>,
) -> Result<Xpriv, KeyError> {
    let secp = Secp256k1::new();
    let mut path = account_path(preset, account_index, custom_path)?;

    if preset == DerivationPreset::Bip48 {
        let st = script_type_for_bip48
            .ok_or_else(|| KeyError::InvalidPath("BIP48 requires an explicit script type".into()))?;
        let component = crate::script_type::bip48_script_type_component(st)?;
        let child = bitcoin::bip32::ChildNumber::from_hardened_idx(component)
            .map_err(|e| KeyError::InvalidPath(e.to_string()))?;
        path = path.child(child);
    }

    master
        .derive_priv(&secp, &path)
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// Derive the xpriv at `/chain/index` relative to an account xpriv.
pub fn address_xpriv(account: &Xpriv, is_change: bool, index: u32) -> Result<Xpriv, KeyError> {
    let secp = Secp256k1::new();
    let path = chain_index_path(is_change, index)?;
    account
        .derive_priv(&secp, &path)
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// The extended public key corresponding to an xpriv, for export or
/// watch-only wallet creation.
pub fn xpub_from_xpriv(xpriv: &Xpriv) -> Xpub {
    let secp = Secp256k1::new();
    Xpub::from_priv(&secp, xpriv)
}

/// The 4-byte BIP32 fingerprint of the key that would sign for this
/// xpriv (i.e. `HASH160(pubkey)[0..4]`), used as `meta.fingerprint` and in
/// PSBT `bip32_derivation` entries.
pub fn fingerprint(xpriv: &Xpriv) -> Fingerprint {
    let secp = Secp256k1::new();
    Xpub::from_priv(&secp, xpriv).fingerprint()
}

/// Materialize the address for a single-sig leaf key at the given script
/// type. `leaf` is the xpriv already derived to the address's full path
/// (account + chain + index).
pub fn address_for_script_type(leaf: &Xpriv, script_type: ScriptType) -> Result<Address, KeyError> {
    let secp = Secp256k1::new();
    let network = Network::Bitcoin;

    match script_type {
        ScriptType::P2pkh => {
            let pk = bitcoin::PublicKey::new(leaf.private_key.public_key(&secp));
            Ok(Address::p2pkh(pk, network))
        }
        ScriptType::P2shP2wpkh => {
            let compressed = CompressedPublicKey(leaf.private_key.public_key(&secp));
            Address::p2shwpkh(&compressed, network).map_err(|e| KeyError::AddressFailed(e.to_string()))
        }
        ScriptType::P2wpkh => {
            let compressed = CompressedPublicKey(leaf.private_key.public_key(&secp));
            Ok(Address::p2wpkh(&compressed, network))
        }
        ScriptType::P2tr => {
            let (xonly, _parity) = leaf.private_key.public_key(&secp).x_only_public_key();
            Ok(Address::p2tr(&secp, xonly, None, network))
        }
        ScriptType::P2wsh | ScriptType::P2shP2wsh => Err(KeyError::AddressFailed(
            "multisig script types require multisig::address, not address_for_script_type".into(),
        )),
    }
}

/// The tweaked x-only output key for a BIP86 taproot leaf (no script
/// path), i.e. the key actually embedded in the address. Exposed
/// separately from [`address_for_script_type`] since PSBT signing needs
/// the tweak, not just the address.
pub fn taproot_output_key(
    leaf: &Xpriv,
) -> (bitcoin::key::TweakedPublicKey, bitcoin::key::Keypair) {
    let secp = Secp256k1::new();
    let keypair = leaf.to_keypair(&secp);
    let (tweaked, _parity) = keypair.x_only_public_key().0.tap_tweak(&secp, None);
    (tweaked, keypair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bip39::{Language, Mnemonic};

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn account(preset: DerivationPreset) -> Xpriv {
        let mnemonic = Mnemonic::parse_in(Language::English, TEST_MNEMONIC).unwrap();
        let seed = seed_from_mnemonic(&mnemonic, "");
        let master = master_xpriv(&seed).unwrap();
        account_xpriv(&master, preset, 0, None, None).unwrap()
    }

    #[test]
    fn bip84_first_receive_address_matches_test_vector() {
        let acct = account(DerivationPreset::Bip84);
        let leaf = address_xpriv(&acct, false, 0).unwrap();
        let address = address_for_script_type(&leaf, ScriptType::P2wpkh).unwrap();
        assert_eq!(
            address.to_string(),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
    }

    #[test]
    fn bip86_first_receive_address_matches_test_vector() {
        let acct = account(DerivationPreset::Bip86);
        let leaf = address_xpriv(&acct, false, 0).unwrap();
        let address = address_for_script_type(&leaf, ScriptType::P2tr).unwrap();
        assert_eq!(
            address.to_string(),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn receive_and_change_addresses_differ() {
        let acct = account(DerivationPreset::Bip84);
        let recv = address_xpriv(&acct, false, 0).unwrap();
        let change = address_xpriv(&acct, true, 0).unwrap();
        let recv_addr = address_for_script_type(&recv, ScriptType::P2wpkh).unwrap();
        let change_addr = address_for_script_type(&change, ScriptType::P2wpkh).unwrap();
        assert_ne!(recv_addr.to_string(), change_addr.to_string());
    }

    #[test]
    fn sequential_addresses_are_unique() {
        let acct = account(DerivationPreset::Bip84);
        let mut seen = std::collections::HashSet::new();
        for i in 0..5 {
            let leaf = address_xpriv(&acct, false, i).unwrap();
            let addr = address_for_script_type(&leaf, ScriptType::P2wpkh).unwrap();
            assert!(seen.insert(addr.to_string()));
        }
    }

    #[test]
    fn p2shwpkh_address_has_legacy_prefix() {
        let acct = account(DerivationPreset::Bip49);
        let leaf = address_xpriv(&acct, false, 0).unwrap();
        let addr = address_for_script_type(&leaf, ScriptType::P2shP2wpkh).unwrap();
        assert!(addr.to_string().starts_with('3'));
    }

    #[test]
    fn p2pkh_address_has_legacy_prefix() {
        let acct = account(DerivationPreset::Bip44);
        let leaf = address_xpriv(&acct, false, 0).unwrap();
        let addr = address_for_script_type(&leaf, ScriptType::P2pkh).unwrap();
        assert!(addr.to_string().starts_with('1'));
    }

    #[test]
    fn passphrase_changes_master_fingerprint() {
        let mnemonic = Mnemonic::parse_in(Language::English, TEST_MNEMONIC).unwrap();
        let seed_a = seed_from_mnemonic(&mnemonic, "");
        let seed_b = seed_from_mnemonic(&mnemonic, "tpassphrase");
        let master_a = master_xpriv(&seed_a).unwrap();
        let master_b = master_xpriv(&seed_b).unwrap();
        assert_ne!(fingerprint(&master_a), fingerprint(&master_b));
    }
}
