//! BitVault Backup Service
//!
//! Encrypted export and restore of a canonical snapshot: every wallet
//! record the app knows about, plus whatever secret material the caller
//! has decrypted for them, sealed under a backup password with the same
//! AEAD envelope the vault uses for PIN-gated secrets (spec §6.5,
//! SPEC_FULL §2).

pub mod error;
pub mod snapshot;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use bitvault_core::password::{estimate_entropy, PasswordStrength};
use bitvault_vault::crypto::{self, EncryptedRecord};
use bitvault_vault::SecretVault;
use bitvault_wallet::CanonicalWalletRecord;

pub use error::BackupError;
pub use snapshot::{BackupSnapshot, SecretEntry, BACKUP_FORMAT_VERSION};

/// Serialize `snapshot` to JSON, encrypt it under `password` with the
/// vault's PBKDF2/AES-256-GCM envelope, and return the result as a
/// base64 blob suitable for writing to a file or sending over the wire.
///
/// Weak passwords are logged, not rejected — `password::estimate_entropy`
/// is an advisory, not a gate (see that module's doc comment).
pub fn export_encrypted_backup(snapshot: &BackupSnapshot, password: &str) -> Result<String, BackupError> {
    let analysis = estimate_entropy(password);
    if analysis.strength < PasswordStrength::Strong {
        log::warn!("backup export password is {:?}: {}", analysis.strength, analysis.warnings.join("; "));
    }

    let plaintext = serde_json::to_vec(snapshot).map_err(|e| BackupError::Serialization(e.to_string()))?;
    let record = crypto::encrypt(password, &plaintext).map_err(BackupError::Vault)?;
    Ok(BASE64.encode(record.to_bytes()))
}

/// Decode and decrypt `blob` with `password`, re-encrypt every secret it
/// carries into `vault` under `pin`, and return the restored wallet
/// records. A wrong password and a tampered blob are indistinguishable,
/// matching the vault's own `InvalidPinOrTampered` folding.
pub fn restore_from_backup(
    blob: &str,
    password: &str,
    pin: &str,
    vault: &SecretVault,
) -> Result<Vec<CanonicalWalletRecord>, BackupError> {
    let bytes = BASE64.decode(blob.trim()).map_err(|e| BackupError::InvalidEncoding(e.to_string()))?;
    let record = EncryptedRecord::from_bytes(&bytes).map_err(|_| BackupError::InvalidPasswordOrCorrupted)?;
    let plaintext = crypto::decrypt(password, &record).map_err(|_| BackupError::InvalidPasswordOrCorrupted)?;

    let snapshot: BackupSnapshot =
        serde_json::from_slice(&plaintext).map_err(|e| BackupError::Serialization(e.to_string()))?;

    if snapshot.version != BACKUP_FORMAT_VERSION {
        return Err(BackupError::UnsupportedVersion { found: snapshot.version, expected: BACKUP_FORMAT_VERSION });
    }

    for secret in &snapshot.secrets {
        vault.store(&secret.wallet_id, secret.secret_type, &secret.plaintext, pin)?;
    }

    log::info!("restored {} wallet(s) from backup created at {}", snapshot.wallets.len(), snapshot.created_at);
    Ok(snapshot.wallets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvault_vault::SecretType;

    fn sample_snapshot() -> BackupSnapshot {
        BackupSnapshot::new(
            1_700_000_000_000,
            vec![],
            vec![SecretEntry {
                wallet_id: "w1".to_string(),
                secret_type: SecretType::Mnemonic,
                plaintext: b"abandon abandon abandon about".to_vec(),
            }],
        )
    }

    #[test]
    fn export_then_restore_recovers_secret() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        let snapshot = sample_snapshot();

        let blob = export_encrypted_backup(&snapshot, "correct horse battery staple").unwrap();
        let wallets = restore_from_backup(&blob, "correct horse battery staple", "1234", &vault).unwrap();
        assert!(wallets.is_empty());

        let restored = vault.read("w1", SecretType::Mnemonic, "1234").unwrap();
        assert_eq!(restored.as_slice(), b"abandon abandon abandon about");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        let blob = export_encrypted_backup(&sample_snapshot(), "correct horse battery staple").unwrap();
        let err = restore_from_backup(&blob, "wrong password", "1234", &vault).unwrap_err();
        assert!(matches!(err, BackupError::InvalidPasswordOrCorrupted));
    }

    #[test]
    fn tampered_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        let mut blob = export_encrypted_backup(&sample_snapshot(), "correct horse battery staple").unwrap();
        blob.pop();
        blob.push(if blob.ends_with('A') { 'B' } else { 'A' });
        let result = restore_from_backup(&blob, "correct horse battery staple", "1234", &vault);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = SecretVault::open(dir.path()).unwrap();
        let mut snapshot = sample_snapshot();
        snapshot.version = 999;
        let blob = export_encrypted_backup(&snapshot, "correct horse battery staple").unwrap();
        let err = restore_from_backup(&blob, "correct horse battery staple", "1234", &vault).unwrap_err();
        assert!(matches!(err, BackupError::UnsupportedVersion { found: 999, .. }));
    }

    #[test]
    fn blob_round_trips_through_base64() {
        let blob = export_encrypted_backup(&sample_snapshot(), "pw").unwrap();
        assert!(BASE64.decode(&blob).is_ok());
    }
}
