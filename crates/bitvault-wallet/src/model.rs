//! The canonical wallet record and its supporting entities (spec §3).

use serde::{Deserialize, Serialize};

use bitvault_keys::{DerivationPreset, ScriptType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalWalletType {
    HdMnemonic,
    HdXprv,
    HdSeed,
    HdDescriptor,
    HdElectrum,
    ImportedKey,
    ImportedKeys,
    WatchXpub,
    WatchDescriptor,
    WatchAddresses,
    Multisig,
}

impl CanonicalWalletType {
    pub fn is_watch_only(&self) -> bool {
        matches!(
            self,
            CanonicalWalletType::WatchXpub
                | CanonicalWalletType::WatchDescriptor
                | CanonicalWalletType::WatchAddresses
        )
    }
}

/// The nine boolean flags a wallet's behavior gates on, computed purely
/// from its `type` (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_sign: bool,
    pub can_derive: bool,
    pub can_export_seed: bool,
    pub can_export_xprv: bool,
    pub can_export_xpub: bool,
    pub requires_pin: bool,
    pub supports_passphrase: bool,
    pub supports_address_discovery: bool,
    pub supports_coin_control: bool,
}

/// Compute the fixed capability table entry for a wallet type. `has_local_cosigner`
/// only matters for `Multisig` (spec §4.5's "✓ if local cosigner" rows).
pub fn capabilities_for(wallet_type: CanonicalWalletType, has_local_cosigner: bool) -> Capabilities {
    use CanonicalWalletType::*;
    match wallet_type {
        HdMnemonic => Capabilities {
            can_sign: true,
            can_derive: true,
            can_export_seed: true,
            can_export_xprv: true,
            can_export_xpub: true,
            requires_pin: true,
            supports_passphrase: true,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        HdXprv => Capabilities {
            can_sign: true,
            can_derive: true,
            can_export_seed: false,
            can_export_xprv: true,
            can_export_xpub: true,
            requires_pin: true,
            supports_passphrase: false,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        HdSeed => Capabilities {
            can_sign: true,
            can_derive: true,
            can_export_seed: false,
            can_export_xprv: true,
            can_export_xpub: true,
            requires_pin: true,
            supports_passphrase: false,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        HdDescriptor => Capabilities {
            can_sign: true,
            can_derive: true,
            can_export_seed: false,
            can_export_xprv: false,
            can_export_xpub: true,
            requires_pin: true,
            supports_passphrase: false,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        HdElectrum => Capabilities {
            can_sign: true,
            can_derive: true,
            can_export_seed: true,
            can_export_xprv: false,
            can_export_xpub: true,
            requires_pin: true,
            supports_passphrase: true,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        ImportedKey | ImportedKeys => Capabilities {
            can_sign: true,
            can_derive: false,
            can_export_seed: false,
            can_export_xprv: false,
            can_export_xpub: false,
            requires_pin: true,
            supports_passphrase: false,
            supports_address_discovery: false,
            supports_coin_control: true,
        },
        WatchXpub => Capabilities {
            can_sign: false,
            can_derive: true,
            can_export_seed: false,
            can_export_xprv: false,
            can_export_xpub: true,
            requires_pin: false,
            supports_passphrase: false,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        WatchDescriptor => Capabilities {
            can_sign: false,
            can_derive: true,
            can_export_seed: false,
            can_export_xprv: false,
            can_export_xpub: false,
            requires_pin: false,
            supports_passphrase: false,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
        WatchAddresses => Capabilities {
            can_sign: false,
            can_derive: false,
            can_export_seed: false,
            can_export_xprv: false,
            can_export_xpub: false,
            requires_pin: false,
            supports_passphrase: false,
            supports_address_discovery: false,
            supports_coin_control: true,
        },
        Multisig => Capabilities {
            can_sign: has_local_cosigner,
            can_derive: true,
            can_export_seed: has_local_cosigner,
            can_export_xprv: false,
            can_export_xpub: true,
            requires_pin: true,
            supports_passphrase: false,
            supports_address_discovery: true,
            supports_coin_control: true,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    pub preset: DerivationPreset,
    pub account_index: u32,
    pub script_type: ScriptType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressCache {
    pub receiving: Vec<AddressInfo>,
    pub change: Vec<AddressInfo>,
    pub last_derived_receiving: i32,
    pub last_derived_change: i32,
}

impl AddressCache {
    pub fn new() -> Self {
        Self {
            receiving: Vec::new(),
            change: Vec::new(),
            last_derived_receiving: -1,
            last_derived_change: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub path: String,
    pub index: u32,
    pub is_change: bool,
    pub script_type: ScriptType,
    pub label: Option<String>,
    pub balance: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    pub status: Option<SyncStatus>,
    pub last_synced_at: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub confirmed: u64,
    pub unconfirmed: u64,
}

impl Balance {
    pub fn total(&self) -> u64 {
        self.confirmed + self.unconfirmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosignerInfo {
    pub id: String,
    pub name: String,
    pub fingerprint: String,
    pub xpub: String,
    pub derivation_path: String,
    pub is_local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigConfig {
    pub m: u8,
    pub n: u8,
    pub script_type: ScriptType,
    pub cosigners: Vec<CosignerInfo>,
    pub derivation_path: String,
    pub sorted_keys: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupMethod {
    Phrase,
    EncryptedFile,
    Descriptor,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub last_backup_at: Option<i64>,
    pub recommended_method: BackupMethod,
    pub can_export_phrase: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletMeta {
    pub fingerprint: Option<String>,
    pub xpub: Option<String>,
    pub descriptor: Option<String>,
    pub watch_addresses: Option<Vec<String>>,
    pub source_format: Option<String>,
    pub has_passphrase: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalWalletRecord {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Fixed: this core is mainnet-only.
    pub network: bitcoin::Network,
    pub wallet_type: CanonicalWalletType,
    pub secret_id: Option<String>,
    pub derivation: Option<DerivationConfig>,
    pub capabilities: Capabilities,
    pub address_cache: AddressCache,
    pub sync: SyncState,
    pub balance: Balance,
    pub multisig: Option<MultisigConfig>,
    pub meta: WalletMeta,
    pub backup: BackupInfo,
}

impl CanonicalWalletRecord {
    /// Invariant (spec §3.3.2): `secretId == null` iff the wallet doesn't
    /// require a PIN iff its type is one of the three watch-only kinds.
    pub fn check_secret_capability_invariant(&self) -> bool {
        (self.secret_id.is_none()) == (!self.capabilities.requires_pin)
            && (!self.capabilities.requires_pin) == self.wallet_type.is_watch_only()
    }
}
