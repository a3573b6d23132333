//! Import-format detection and normalization into a
//! [`CanonicalWalletRecord`] (spec §4.5, §6.3).

use std::str::FromStr;

use bitcoin::bip32::Xpub;
use bitvault_keys::ScriptType;

use crate::error::WalletError;
use crate::model::CanonicalWalletType;

/// The raw payload handed to the normalizer, already classified by the UI
/// boundary (which format the user picked / pasted).
#[derive(Debug, Clone)]
pub enum ImportPayload {
    Mnemonic { words: String, passphrase: String },
    ExtendedPrivateKey { encoded: String },
    RawSeedHex { hex: String },
    PrivateDescriptor { descriptor: String },
    ElectrumSeed { words: String, passphrase: String },
    Wif { encoded: String },
    WifList { lines: Vec<String> },
    ExtendedPublicKey { encoded: String },
    PublicDescriptor { descriptor: String },
    AddressList { lines: Vec<String> },
    MultisigConfig { descriptor: String },
}

#[derive(Debug, Clone, Copy)]
pub struct FormatHint {
    pub wallet_type: CanonicalWalletType,
    pub suggested_script_type: Option<ScriptType>,
}

/// Infer script type from an extended-key version-byte prefix (the first
/// 4 characters of the base58check-encoded string).
fn script_type_from_xkey_prefix(encoded: &str) -> Option<ScriptType> {
    let prefix = encoded.get(0..4)?;
    match prefix {
        "xprv" | "xpub" => Some(ScriptType::P2pkh),
        "yprv" | "ypub" => Some(ScriptType::P2shP2wpkh),
        "zprv" | "zpub" => Some(ScriptType::P2wpkh),
        "Yprv" | "Ypub" => Some(ScriptType::P2shP2wsh),
        "Zprv" | "Zpub" => Some(ScriptType::P2wsh),
        "vprv" | "vpub" | "uprv" | "upub" => Some(ScriptType::P2wpkh),
        _ => None,
    }
}

/// Classify a payload into its canonical wallet type and a suggested
/// script type, per the mapping in spec §4.5.1.
pub fn classify(payload: &ImportPayload) -> Result<FormatHint, WalletError> {
    use CanonicalWalletType::*;
    match payload {
        ImportPayload::Mnemonic { .. } => Ok(FormatHint {
            wallet_type: HdMnemonic,
            suggested_script_type: Some(ScriptType::P2wpkh),
        }),
        ImportPayload::ExtendedPrivateKey { encoded } => Ok(FormatHint {
            wallet_type: HdXprv,
            suggested_script_type: script_type_from_xkey_prefix(encoded),
        }),
        ImportPayload::RawSeedHex { hex } => {
            let len = hex.len() / 2;
            if !(32..=64).contains(&len) || hex.len() % 2 != 0 {
                return Err(WalletError::InvalidPayload(format!(
                    "raw seed must be 32-64 bytes, got {len}"
                )));
            }
            Ok(FormatHint {
                wallet_type: HdSeed,
                suggested_script_type: Some(ScriptType::P2wpkh),
            })
        }
        ImportPayload::PrivateDescriptor { .. } => Ok(FormatHint {
            wallet_type: HdDescriptor,
            suggested_script_type: None,
        }),
        ImportPayload::ElectrumSeed { .. } => Ok(FormatHint {
            wallet_type: HdElectrum,
            suggested_script_type: Some(ScriptType::P2pkh),
        }),
        ImportPayload::Wif { .. } => Ok(FormatHint {
            wallet_type: ImportedKey,
            suggested_script_type: Some(ScriptType::P2wpkh),
        }),
        ImportPayload::WifList { lines } => {
            if lines.is_empty() {
                return Err(WalletError::InvalidPayload("empty WIF list".to_string()));
            }
            Ok(FormatHint {
                wallet_type: ImportedKeys,
                suggested_script_type: Some(ScriptType::P2wpkh),
            })
        }
        ImportPayload::ExtendedPublicKey { encoded } => {
            Xpub::from_str(encoded).map_err(|e| WalletError::InvalidPayload(e.to_string()))?;
            Ok(FormatHint {
                wallet_type: WatchXpub,
                suggested_script_type: script_type_from_xkey_prefix(encoded),
            })
        }
        ImportPayload::PublicDescriptor { .. } => Ok(FormatHint {
            wallet_type: WatchDescriptor,
            suggested_script_type: None,
        }),
        ImportPayload::AddressList { lines } => {
            if lines.is_empty() {
                return Err(WalletError::InvalidPayload("empty address list".to_string()));
            }
            Ok(FormatHint {
                wallet_type: WatchAddresses,
                suggested_script_type: None,
            })
        }
        ImportPayload::MultisigConfig { .. } => Ok(FormatHint {
            wallet_type: Multisig,
            suggested_script_type: Some(ScriptType::P2wsh),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_maps_to_hd_mnemonic() {
        let hint = classify(&ImportPayload::Mnemonic {
            words: "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about".to_string(),
            passphrase: String::new(),
        })
        .unwrap();
        assert_eq!(hint.wallet_type, CanonicalWalletType::HdMnemonic);
    }

    #[test]
    fn zpub_maps_to_watch_xpub_with_p2wpkh_hint() {
        let zpub = "zpub6rFR7y4Q2AijBEqTUquhVz398htDFrtymD9xYYfG1m4wAcvPhXNfE3EfH1r1ADqtfSdVCToUG868RvUUkgRn4jZXtb8AarP2dpGJBXgSDsRj";
        let hint = classify(&ImportPayload::ExtendedPublicKey {
            encoded: zpub.to_string(),
        })
        .unwrap();
        assert_eq!(hint.wallet_type, CanonicalWalletType::WatchXpub);
        assert_eq!(hint.suggested_script_type, Some(ScriptType::P2wpkh));
    }

    #[test]
    fn raw_seed_length_is_validated() {
        let too_short = "aa".repeat(10);
        assert!(classify(&ImportPayload::RawSeedHex { hex: too_short }).is_err());
    }

    #[test]
    fn empty_wif_list_is_rejected() {
        assert!(classify(&ImportPayload::WifList { lines: vec![] }).is_err());
    }

    #[test]
    fn address_list_maps_to_watch_addresses() {
        let hint = classify(&ImportPayload::AddressList {
            lines: vec!["bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string()],
        })
        .unwrap();
        assert_eq!(hint.wallet_type, CanonicalWalletType::WatchAddresses);
    }

    #[test]
    fn multisig_config_suggests_p2wsh() {
        let hint = classify(&ImportPayload::MultisigConfig {
            descriptor: "wsh(sortedmulti(2,...))".to_string(),
        })
        .unwrap();
        assert_eq!(hint.suggested_script_type, Some(ScriptType::P2wsh));
    }
}
