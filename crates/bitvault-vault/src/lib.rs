//! BitVault Secret Vault
//!
//! At-rest encryption of seeds, extended private keys, WIF keys, and
//! cosigner material, gated by a PIN with progressive lockout.

pub mod crypto;
pub mod error;
pub mod pinauth;
pub mod storage;

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub use error::VaultError;
pub use pinauth::{PinAuthCoordinator, PinLengthPolicy};
pub use storage::SecureStore;

/// The kind of secret material stored under a single `(walletId, type)`
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretType {
    Mnemonic,
    Xprv,
    Wif,
    CosignerSeed(u8),
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretType::Mnemonic => write!(f, "mnemonic"),
            SecretType::Xprv => write!(f, "xprv"),
            SecretType::Wif => write!(f, "wif"),
            SecretType::CosignerSeed(idx) => write!(f, "cosigner_seed_{idx}"),
        }
    }
}

const MAX_COSIGNER_INDEX: u8 = 14;

pub struct SecretVault {
    store: SecureStore,
}

impl SecretVault {
    pub fn open(data_dir: impl Into<std::path::PathBuf>) -> Result<Self, VaultError> {
        Ok(Self {
            store: SecureStore::open(data_dir)?,
        })
    }

    pub fn pin_auth(&self) -> PinAuthCoordinator<'_> {
        PinAuthCoordinator::new(&self.store)
    }

    /// Encrypt `secret` under a key derived from `pin` and commit it to
    /// storage. Does not itself consult the lockout coordinator — callers
    /// (the daemon command layer) check [`PinAuthCoordinator::check_not_locked`]
    /// before invoking any PIN-gated operation.
    pub fn store(
        &self,
        wallet_id: &str,
        secret_type: SecretType,
        secret: &[u8],
        pin: &str,
    ) -> Result<(), VaultError> {
        let record = crypto::encrypt(pin, secret)?;
        self.store
            .write(wallet_id, &secret_type.to_string(), &record.to_bytes())
    }

    /// Returns the plaintext iff the PIN authenticates and the AEAD tag
    /// verifies; both failure modes surface as
    /// [`VaultError::InvalidPinOrTampered`].
    pub fn read(
        &self,
        wallet_id: &str,
        secret_type: SecretType,
        pin: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let bytes = self.store.read(wallet_id, &secret_type.to_string())?;
        let record = crypto::EncryptedRecord::from_bytes(&bytes)?;
        crypto::decrypt(pin, &record)
    }

    pub fn store_cosigner_seed(
        &self,
        wallet_id: &str,
        index: u8,
        mnemonic: &str,
        pin: &str,
    ) -> Result<(), VaultError> {
        if index > MAX_COSIGNER_INDEX {
            return Err(VaultError::InvalidCosignerIndex(index));
        }
        self.store(wallet_id, SecretType::CosignerSeed(index), mnemonic.as_bytes(), pin)
    }

    pub fn delete_all_for_wallet(&self, wallet_id: &str) -> Result<(), VaultError> {
        self.store.delete_all_for_wallet(wallet_id)
    }

    pub fn delete_all(&self) -> Result<(), VaultError> {
        self.store.delete_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        vault.store("w1", SecretType::Mnemonic, b"abandon abandon ... about", "1234").unwrap();
        let plaintext = vault.read("w1", SecretType::Mnemonic, "1234").unwrap();
        assert_eq!(plaintext.as_slice(), b"abandon abandon ... about");
    }

    #[test]
    fn wrong_pin_is_indistinguishable_from_tampered() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        vault.store("w1", SecretType::Mnemonic, b"secret", "1234").unwrap();
        let err = vault.read("w1", SecretType::Mnemonic, "0000").unwrap_err();
        assert!(matches!(err, VaultError::InvalidPinOrTampered));
    }

    #[test]
    fn cosigner_seed_index_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        assert!(vault.store_cosigner_seed("w1", 14, "seed words", "1234").is_ok());
        assert!(matches!(
            vault.store_cosigner_seed("w1", 15, "seed words", "1234"),
            Err(VaultError::InvalidCosignerIndex(15))
        ));
    }

    #[test]
    fn delete_all_for_wallet_removes_cosigners_and_main_secret() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        vault.store("w1", SecretType::Mnemonic, b"secret", "1234").unwrap();
        vault.store_cosigner_seed("w1", 0, "cosigner words", "1234").unwrap();
        vault.delete_all_for_wallet("w1").unwrap();
        assert!(matches!(
            vault.read("w1", SecretType::Mnemonic, "1234"),
            Err(VaultError::NotFound)
        ));
    }

    #[test]
    fn lockout_coordinator_shares_storage_with_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        let coordinator = vault.pin_auth();
        for _ in 0..5 {
            coordinator.record_failure("w1").unwrap();
        }
        assert!(coordinator.check_not_locked("w1").is_err());
    }
}
