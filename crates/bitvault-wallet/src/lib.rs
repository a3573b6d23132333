//! BitVault Wallet Normalizer
//!
//! Builds the canonical wallet record from any recognized import payload
//! and computes its fixed capability flags.

pub mod error;
pub mod import;
pub mod model;

use bitvault_vault::{SecretType, SecretVault};

pub use error::WalletError;
pub use import::{classify, FormatHint, ImportPayload};
pub use model::*;

/// Build a fresh [`CanonicalWalletRecord`] from an import payload,
/// committing its secret (if any) to the vault before the record is
/// considered valid.
///
/// Ordering (spec §4.5, §3.3.6 write-ahead invariant): the secret is
/// written to the vault first; the record is only assembled afterward.
/// If anything past that point fails, the caller must roll back the
/// vault write — this function does not itself retain partial state.
pub struct WalletNormalizer<'a> {
    vault: &'a SecretVault,
}

impl<'a> WalletNormalizer<'a> {
    pub fn new(vault: &'a SecretVault) -> Self {
        Self { vault }
    }

    pub fn normalize(
        &self,
        id: String,
        name: String,
        now_epoch_ms: i64,
        payload: &ImportPayload,
        pin: Option<&str>,
        script_type_override: Option<bitvault_keys::ScriptType>,
    ) -> Result<CanonicalWalletRecord, WalletError> {
        let hint = classify(payload)?;
        let script_type = script_type_override
            .or(hint.suggested_script_type)
            .unwrap_or(bitvault_keys::ScriptType::P2wpkh);

        let secret_id = self.commit_secret(&id, payload, &hint, pin)?;

        let capabilities = capabilities_for(hint.wallet_type, true);

        if secret_id.is_none() != !capabilities.requires_pin {
            return Err(WalletError::Internal(
                "secret/capability invariant violated during normalization".to_string(),
            ));
        }

        let meta = self.build_meta(payload, &hint);

        let derivation = (!hint.wallet_type.is_watch_only() || hint.wallet_type == CanonicalWalletType::WatchXpub)
            .then_some(DerivationConfig {
                preset: default_preset_for_script_type(script_type),
                account_index: 0,
                script_type,
            });

        let backup = BackupInfo {
            last_backup_at: None,
            recommended_method: recommended_backup_method(hint.wallet_type, capabilities.can_export_seed),
            can_export_phrase: capabilities.can_export_seed,
        };

        Ok(CanonicalWalletRecord {
            id,
            name,
            created_at: now_epoch_ms,
            updated_at: now_epoch_ms,
            network: bitcoin::Network::Bitcoin,
            wallet_type: hint.wallet_type,
            secret_id,
            derivation,
            capabilities,
            address_cache: AddressCache::new(),
            sync: SyncState::default(),
            balance: Balance::default(),
            multisig: None,
            meta,
            backup,
        })
    }

    fn commit_secret(
        &self,
        wallet_id: &str,
        payload: &ImportPayload,
        hint: &FormatHint,
        pin: Option<&str>,
    ) -> Result<Option<String>, WalletError> {
        if hint.wallet_type.is_watch_only() {
            return Ok(None);
        }
        let pin = pin.ok_or_else(|| WalletError::InvalidPayload("PIN required to store secret".to_string()))?;

        let (secret_type, bytes): (SecretType, Vec<u8>) = match payload {
            ImportPayload::Mnemonic { words, .. } | ImportPayload::ElectrumSeed { words, .. } => {
                (SecretType::Mnemonic, words.as_bytes().to_vec())
            }
            ImportPayload::ExtendedPrivateKey { encoded } => (SecretType::Xprv, encoded.as_bytes().to_vec()),
            ImportPayload::RawSeedHex { hex } => (SecretType::Xprv, hex.as_bytes().to_vec()),
            ImportPayload::PrivateDescriptor { descriptor } => {
                (SecretType::Xprv, descriptor.as_bytes().to_vec())
            }
            ImportPayload::Wif { encoded } => (SecretType::Wif, encoded.as_bytes().to_vec()),
            ImportPayload::WifList { lines } => (SecretType::Wif, lines.join("\n").into_bytes()),
            ImportPayload::MultisigConfig { descriptor } => {
                (SecretType::Xprv, descriptor.as_bytes().to_vec())
            }
            ImportPayload::ExtendedPublicKey { .. }
            | ImportPayload::PublicDescriptor { .. }
            | ImportPayload::AddressList { .. } => {
                return Ok(None);
            }
        };

        self.vault.store(wallet_id, secret_type, &bytes, pin)?;
        Ok(Some(format!("{wallet_id}:{secret_type}")))
    }

    fn build_meta(&self, payload: &ImportPayload, hint: &FormatHint) -> WalletMeta {
        let mut meta = WalletMeta::default();
        meta.source_format = Some(format!("{:?}", hint.wallet_type));
        match payload {
            ImportPayload::Mnemonic { passphrase, .. } | ImportPayload::ElectrumSeed { passphrase, .. } => {
                meta.has_passphrase = Some(!passphrase.is_empty());
            }
            ImportPayload::ExtendedPublicKey { encoded } => {
                meta.xpub = Some(encoded.clone());
            }
            ImportPayload::PublicDescriptor { descriptor } | ImportPayload::PrivateDescriptor { descriptor } => {
                meta.descriptor = Some(descriptor.clone());
            }
            ImportPayload::AddressList { lines } => {
                meta.watch_addresses = Some(lines.clone());
            }
            _ => {}
        }
        meta
    }
}

fn default_preset_for_script_type(script_type: bitvault_keys::ScriptType) -> bitvault_keys::DerivationPreset {
    use bitvault_keys::{DerivationPreset, ScriptType};
    match script_type {
        ScriptType::P2pkh => DerivationPreset::Bip44,
        ScriptType::P2shP2wpkh => DerivationPreset::Bip49,
        ScriptType::P2wpkh => DerivationPreset::Bip84,
        ScriptType::P2tr => DerivationPreset::Bip86,
        ScriptType::P2wsh | ScriptType::P2shP2wsh => DerivationPreset::Bip48,
    }
}

fn recommended_backup_method(wallet_type: CanonicalWalletType, can_export_seed: bool) -> BackupMethod {
    use CanonicalWalletType::*;
    match wallet_type {
        _ if wallet_type.is_watch_only() => BackupMethod::None,
        HdMnemonic | HdElectrum if can_export_seed => BackupMethod::Phrase,
        HdDescriptor | Multisig => BackupMethod::Descriptor,
        _ => BackupMethod::EncryptedFile,
    }
}
