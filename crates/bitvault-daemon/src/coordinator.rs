//! AppStateCoordinator — the single owner of wallet state (spec §9
//! "Global mutable stores" redesign). All wallet-record mutations funnel
//! through this struct's methods, each guarded by the same mutex, so
//! writes to the active wallet are totally ordered (spec §5).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use zeroize::Zeroizing;

use bitvault_backup::{export_encrypted_backup, BackupSnapshot, SecretEntry};
use bitvault_vault::SecretVault;
use bitvault_wallet::CanonicalWalletRecord;

use crate::error::CoreError;

/// Explicit lifecycle for the "preserve on delete" archive password (spec
/// §9 Open Question): established by one command, consumed by the next
/// `resetToFreshInstall`, or cleared by explicit cancellation. Never
/// implicit.
pub struct PreserveDataSession {
    pub password: Zeroizing<String>,
    pub established_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Archive current state (wallets + secrets) before wiping, using the
    /// password from an active `PreserveDataSession`. If no session is
    /// active, this is ignored and nothing is archived.
    pub preserve_data: bool,
}

struct CoordinatorState {
    wallets: HashMap<String, CanonicalWalletRecord>,
    active_wallet_id: Option<String>,
}

/// Serializes every wallet-state mutation behind one mutex (spec §5:
/// "single-threaded cooperative for wallet state mutations"). I/O-bound
/// work (Electrum, vault reads) happens outside the lock; only the state
/// transition itself is serialized.
pub struct AppStateCoordinator {
    state: Mutex<CoordinatorState>,
    preserve_session: Mutex<Option<PreserveDataSession>>,
    reset_in_progress: AtomicBool,
    vault: SecretVault,
    data_dir: PathBuf,
}

const SNAPSHOT_DB_FILENAME: &str = "snapshot.sqlite3";
const ARCHIVE_FILENAME: &str = "preserve_archive.bin";

impl AppStateCoordinator {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| CoreError::Io(e.to_string()))?;
        let vault = SecretVault::open(&data_dir)?;
        Ok(Self {
            state: Mutex::new(CoordinatorState { wallets: HashMap::new(), active_wallet_id: None }),
            preserve_session: Mutex::new(None),
            reset_in_progress: AtomicBool::new(false),
            vault,
            data_dir,
        })
    }

    pub fn vault(&self) -> &SecretVault {
        &self.vault
    }

    /// Invariant (spec §3.3.1): exactly one wallet is active at a time.
    /// The first wallet added becomes active automatically.
    pub fn add_wallet(&self, record: CanonicalWalletRecord) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        let id = record.id.clone();
        let is_first = state.wallets.is_empty();
        state.wallets.insert(id.clone(), record);
        if is_first {
            state.active_wallet_id = Some(id);
        }
        Ok(())
    }

    pub fn set_active(&self, wallet_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.wallets.contains_key(wallet_id) {
            return Err(CoreError::wallet_not_found(wallet_id));
        }
        state.active_wallet_id = Some(wallet_id.to_string());
        Ok(())
    }

    pub fn active_wallet(&self) -> Result<CanonicalWalletRecord, CoreError> {
        let state = self.state.lock().unwrap();
        let id = state.active_wallet_id.as_ref().ok_or(CoreError::no_active_wallet())?;
        Ok(state.wallets.get(id).expect("active id always refers to a present wallet").clone())
    }

    pub fn list_wallets(&self) -> Vec<CanonicalWalletRecord> {
        let state = self.state.lock().unwrap();
        state.wallets.values().cloned().collect()
    }

    pub fn rename(&self, wallet_id: &str, name: &str, now_epoch_ms: i64) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| CoreError::wallet_not_found(wallet_id))?;
        record.name = name.to_string();
        record.updated_at = now_epoch_ms;
        Ok(())
    }

    /// Delete one wallet's record and secrets. Distinct from
    /// `reset_to_fresh_install`, which wipes every wallet.
    pub fn delete_wallet(&self, wallet_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.wallets.contains_key(wallet_id) {
            return Err(CoreError::wallet_not_found(wallet_id));
        }
        self.vault.delete_all_for_wallet(wallet_id)?;
        state.wallets.remove(wallet_id);
        if state.active_wallet_id.as_deref() == Some(wallet_id) {
            state.active_wallet_id = state.wallets.keys().next().cloned();
        }
        Ok(())
    }

    pub fn begin_preserve_session(&self, password: String, now_epoch_ms: i64) {
        let mut session = self.preserve_session.lock().unwrap();
        *session = Some(PreserveDataSession { password: Zeroizing::new(password), established_at: now_epoch_ms });
    }

    pub fn cancel_preserve_session(&self) {
        let mut session = self.preserve_session.lock().unwrap();
        *session = None;
    }

    fn snapshot_db_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_DB_FILENAME)
    }

    fn archive_path(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_FILENAME)
    }

    /// Sequenced teardown per spec §3.4: stop I/O → archive (if
    /// preserving) → wipe DB → wipe vault → wipe indexed-by-id caches →
    /// zero in-memory state → verify fresh-install state.
    ///
    /// Only one reset may run at a time (spec §5 "Reset mutex: global");
    /// a concurrent caller fails fast rather than queuing.
    pub fn reset_to_fresh_install(&self, options: ResetOptions, secrets: &[SecretEntry], now_epoch_ms: i64) -> Result<(), CoreError> {
        if self.reset_in_progress.swap(true, Ordering::SeqCst) {
            return Err(CoreError::reset_in_progress());
        }
        let result = self.reset_inner(options, secrets, now_epoch_ms);
        self.reset_in_progress.store(false, Ordering::SeqCst);
        result
    }

    fn reset_inner(&self, options: ResetOptions, secrets: &[SecretEntry], now_epoch_ms: i64) -> Result<(), CoreError> {
        log::info!("resetToFreshInstall: stopping I/O for all wallets");
        // Step 1: stop I/O. No sync tasks are owned by this coordinator
        // directly; callers holding SyncEngine handles must have already
        // cancelled them before invoking this reset.

        if options.preserve_data {
            let session = self.preserve_session.lock().unwrap();
            if let Some(session) = session.as_ref() {
                log::info!("resetToFreshInstall: archiving state before wipe");
                let wallets = self.list_wallets();
                let snapshot = BackupSnapshot::new(now_epoch_ms, wallets, secrets.to_vec());
                let blob = export_encrypted_backup(&snapshot, session.password.as_str())?;
                std::fs::write(self.archive_path(), blob).map_err(|e| CoreError::Io(e.to_string()))?;
            } else {
                log::warn!("resetToFreshInstall: preserve_data requested but no PreserveDataSession is active — skipping archive");
            }
        }

        log::info!("resetToFreshInstall: wiping canonical snapshot DB");
        let db_path = self.snapshot_db_path();
        if db_path.exists() {
            std::fs::remove_file(&db_path).map_err(|e| CoreError::Io(e.to_string()))?;
        }

        log::info!("resetToFreshInstall: wiping vault");
        self.vault.delete_all()?;

        log::info!("resetToFreshInstall: wiping indexed-by-id caches and zeroing in-memory state");
        {
            let mut state = self.state.lock().unwrap();
            state.wallets.clear();
            state.active_wallet_id = None;
        }
        self.cancel_preserve_session();

        self.verify_fresh_install_state()
    }

    fn verify_fresh_install_state(&self) -> Result<(), CoreError> {
        let state = self.state.lock().unwrap();
        let db_gone = !self.snapshot_db_path().exists();
        if state.wallets.is_empty() && state.active_wallet_id.is_none() && db_gone {
            log::info!("resetToFreshInstall: verified fresh-install state");
            Ok(())
        } else {
            Err(CoreError::reset_verification_failed())
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvault_wallet::{
        capabilities_for, AddressCache, Balance, BackupInfo, BackupMethod, CanonicalWalletType, SyncState, WalletMeta,
    };

    fn sample_wallet(id: &str) -> CanonicalWalletRecord {
        CanonicalWalletRecord {
            id: id.to_string(),
            name: "Test".to_string(),
            created_at: 0,
            updated_at: 0,
            network: bitcoin::Network::Bitcoin,
            wallet_type: CanonicalWalletType::WatchAddresses,
            secret_id: None,
            derivation: None,
            capabilities: capabilities_for(CanonicalWalletType::WatchAddresses, false),
            address_cache: AddressCache::default(),
            sync: SyncState::default(),
            balance: Balance::default(),
            multisig: None,
            meta: WalletMeta::default(),
            backup: BackupInfo { last_backup_at: None, recommended_method: BackupMethod::None, can_export_phrase: false },
        }
    }

    #[test]
    fn first_wallet_added_becomes_active() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = AppStateCoordinator::new(dir.path()).unwrap();
        coordinator.add_wallet(sample_wallet("w1")).unwrap();
        assert_eq!(coordinator.active_wallet().unwrap().id, "w1");
    }

    #[test]
    fn set_active_rejects_unknown_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = AppStateCoordinator::new(dir.path()).unwrap();
        assert!(matches!(
            coordinator.set_active("ghost"),
            Err(CoreError::StateError(crate::error::StateErrorKind::WalletNotFound(_)))
        ));
    }

    #[test]
    fn deleting_active_wallet_promotes_another_if_present() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = AppStateCoordinator::new(dir.path()).unwrap();
        coordinator.add_wallet(sample_wallet("w1")).unwrap();
        coordinator.add_wallet(sample_wallet("w2")).unwrap();
        coordinator.delete_wallet("w1").unwrap();
        assert_eq!(coordinator.active_wallet().unwrap().id, "w2");
    }

    #[test]
    fn reset_without_preserve_session_wipes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = AppStateCoordinator::new(dir.path()).unwrap();
        coordinator.add_wallet(sample_wallet("w1")).unwrap();
        coordinator.reset_to_fresh_install(ResetOptions { preserve_data: false }, &[], 0).unwrap();
        assert!(matches!(
            coordinator.active_wallet(),
            Err(CoreError::StateError(crate::error::StateErrorKind::NoActiveWallet))
        ));
        assert!(coordinator.list_wallets().is_empty());
    }

    #[test]
    fn reset_with_preserve_session_writes_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = AppStateCoordinator::new(dir.path()).unwrap();
        coordinator.add_wallet(sample_wallet("w1")).unwrap();
        coordinator.begin_preserve_session("archive password".to_string(), 0);
        coordinator.reset_to_fresh_install(ResetOptions { preserve_data: true }, &[], 0).unwrap();
        assert!(dir.path().join(ARCHIVE_FILENAME).exists());
    }

    #[test]
    fn concurrent_reset_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = AppStateCoordinator::new(dir.path()).unwrap();
        coordinator.reset_in_progress.store(true, Ordering::SeqCst);
        let err = coordinator.reset_to_fresh_install(ResetOptions::default(), &[], 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::StateError(crate::error::StateErrorKind::ResetInProgress)
        ));
    }
}
