//! The self-contained payload that gets encrypted into a backup blob:
//! every wallet record plus whatever secret material the caller has
//! decrypted for it. Assembling this is the "canonical snapshot assembly"
//! half of BackupService (spec §2, component K).

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use bitvault_vault::SecretType;
use bitvault_wallet::CanonicalWalletRecord;

pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// One wallet's plaintext secret, as held by an already-unlocked session.
/// `exportEncryptedBackup` has no PIN parameter (spec §6.5) — the caller
/// supplies secrets it has already decrypted, keyed by wallet id.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretEntry {
    #[zeroize(skip)]
    pub wallet_id: String,
    #[zeroize(skip)]
    pub secret_type: SecretType,
    pub plaintext: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub version: u32,
    pub created_at: i64,
    pub wallets: Vec<CanonicalWalletRecord>,
    pub secrets: Vec<SecretEntry>,
}

impl BackupSnapshot {
    pub fn new(created_at: i64, wallets: Vec<CanonicalWalletRecord>, secrets: Vec<SecretEntry>) -> Self {
        Self { version: BACKUP_FORMAT_VERSION, created_at, wallets, secrets }
    }

    pub fn secrets_for(&self, wallet_id: &str) -> impl Iterator<Item = &SecretEntry> {
        self.secrets.iter().filter(move |s| s.wallet_id == wallet_id)
    }
}
