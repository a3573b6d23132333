//! Script types and derivation path presets (spec §3.1, §4.4).

use std::fmt;
use std::str::FromStr;

use bitcoin::bip32::DerivationPath;
use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// The script type a wallet (or a single address) materializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    P2pkh,
    P2shP2wpkh,
    P2wpkh,
    P2tr,
    P2wsh,
    P2shP2wsh,
}

impl ScriptType {
    /// Whether this script type is a (bare or wrapped) multisig type.
    pub fn is_multisig(&self) -> bool {
        matches!(self, ScriptType::P2wsh | ScriptType::P2shP2wsh)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptType::P2pkh => "p2pkh",
            ScriptType::P2shP2wpkh => "p2sh-p2wpkh",
            ScriptType::P2wpkh => "p2wpkh",
            ScriptType::P2tr => "p2tr",
            ScriptType::P2wsh => "p2wsh",
            ScriptType::P2shP2wsh => "p2sh-p2wsh",
        };
        f.write_str(s)
    }
}

/// A derivation path preset, one of the named BIPs or a user-supplied
/// custom path (spec §3.1 `derivation.preset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationPreset {
    Hd,
    Bip44,
    Bip49,
    Bip84,
    Bip86,
    Bip48,
    Custom,
}

impl DerivationPreset {
    /// The purpose-level hardened component (BIP43), where applicable.
    pub fn purpose(&self) -> Option<u32> {
        match self {
            DerivationPreset::Bip44 => Some(44),
            DerivationPreset::Bip49 => Some(49),
            DerivationPreset::Bip84 => Some(84),
            DerivationPreset::Bip86 => Some(86),
            DerivationPreset::Bip48 => Some(48),
            DerivationPreset::Hd | DerivationPreset::Custom => None,
        }
    }

    /// The natural script type for this preset (single-sig presets only;
    /// BIP48 is multisig and its script type is chosen by the caller per
    /// the multisig config, not implied by the path alone).
    pub fn natural_script_type(&self) -> Option<ScriptType> {
        match self {
            DerivationPreset::Bip44 => Some(ScriptType::P2pkh),
            DerivationPreset::Bip49 => Some(ScriptType::P2shP2wpkh),
            DerivationPreset::Bip84 => Some(ScriptType::P2wpkh),
            DerivationPreset::Bip86 => Some(ScriptType::P2tr),
            DerivationPreset::Bip48 | DerivationPreset::Hd | DerivationPreset::Custom => None,
        }
    }
}

/// Mainnet coin type is always 0 — this core is mainnet-only (spec §1
/// Non-goals).
const COIN_TYPE: u32 = 0;

/// Build the account-level derivation path for a preset, e.g.
/// `m/84'/0'/0'` for BIP84 account 0.
///
/// For `Custom`, `custom_path` must be provided and is parsed and
/// returned as-is (the account-level and chain/index split is then the
/// caller's responsibility, since a custom path has no fixed depth).
pub fn account_path(
    preset: DerivationPreset,
    account_index: u32,
    custom_path: Option<&str>,
) -> Result<DerivationPath, KeyError> {
    match preset {
        DerivationPreset::Custom => {
            let raw = custom_path.ok_or(KeyError::InvalidPath("custom preset requires a path".into()))?;
            DerivationPath::from_str(raw).map_err(|e| KeyError::InvalidPath(e.to_string()))
        }
        DerivationPreset::Bip48 => {
            // BIP48 multisig: m/48'/0'/account'/script_type' — the script-type
            // component (2' for P2WSH) is appended by the multisig-specific
            // caller; this returns the shared prefix.
            let raw = format!("m/48'/{}'/{}'", COIN_TYPE, account_index);
            DerivationPath::from_str(&raw).map_err(|e| KeyError::InvalidPath(e.to_string()))
        }
        DerivationPreset::Hd => {
            // Electrum-style / bare HD root, no purpose/coin-type levels.
            DerivationPath::from_str("m").map_err(|e| KeyError::InvalidPath(e.to_string()))
        }
        _ => {
            let purpose = preset.purpose().expect("non-custom, non-hd preset has a purpose");
            let raw = format!("m/{}'/{}'/{}'", purpose, COIN_TYPE, account_index);
            DerivationPath::from_str(&raw).map_err(|e| KeyError::InvalidPath(e.to_string()))
        }
    }
}

/// BIP48 script-type component appended after the account level:
/// `1'` for P2SH-P2WSH, `2'` for P2WSH.
pub fn bip48_script_type_component(script_type: ScriptType) -> Result<u32, KeyError> {
    match script_type {
        ScriptType::P2shP2wsh => Ok(1),
        ScriptType::P2wsh => Ok(2),
        other => Err(KeyError::InvalidPath(format!(
            "BIP48 does not define a component for {other}"
        ))),
    }
}

/// Build the `/chain/index` suffix path (relative to an account xpriv),
/// e.g. `/0/5` for the 6th receiving address.
pub fn chain_index_path(is_change: bool, index: u32) -> Result<DerivationPath, KeyError> {
    let chain = if is_change { 1 } else { 0 };
    DerivationPath::from_str(&format!("m/{}/{}", chain, index))
        .map_err(|e| KeyError::InvalidPath(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bip84_account_path_is_correct() {
        let path = account_path(DerivationPreset::Bip84, 0, None).unwrap();
        assert_eq!(path.to_string(), "84'/0'/0'");
    }

    #[test]
    fn bip44_natural_script_type_is_p2pkh() {
        assert_eq!(
            DerivationPreset::Bip44.natural_script_type(),
            Some(ScriptType::P2pkh)
        );
    }

    #[test]
    fn custom_preset_requires_path() {
        assert!(account_path(DerivationPreset::Custom, 0, None).is_err());
        assert!(account_path(DerivationPreset::Custom, 0, Some("m/1'/2'")).is_ok());
    }

    #[test]
    fn chain_index_path_receive_vs_change() {
        let recv = chain_index_path(false, 3).unwrap();
        let change = chain_index_path(true, 3).unwrap();
        assert_eq!(recv.to_string(), "0/3");
        assert_eq!(change.to_string(), "1/3");
    }
}
