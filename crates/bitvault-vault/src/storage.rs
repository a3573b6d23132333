//! Platform-protected storage: one file per `(walletId, secretType)` pair
//! under a vault data directory, mode 0600 on unix. This stands in for a
//! real OS keystore (Keychain/Credential Manager/Secret Service) — the
//! contract callers depend on (device-only, no cloud sync) is upheld by
//! keeping everything under an operator-controlled directory with
//! restrictive permissions.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VaultError;

pub struct SecureStore {
    root: PathBuf,
}

fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl SecureStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| VaultError::Storage(e.to_string()))?;
        set_dir_permissions(&root)?;
        Ok(Self { root })
    }

    fn entry_path(&self, wallet_id: &str, secret_type: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}.bin",
            sanitize_component(wallet_id),
            sanitize_component(secret_type)
        ))
    }

    pub fn write(&self, wallet_id: &str, secret_type: &str, bytes: &[u8]) -> Result<(), VaultError> {
        let path = self.entry_path(wallet_id, secret_type);
        fs::write(&path, bytes).map_err(|e| VaultError::Storage(e.to_string()))?;
        set_file_permissions(&path)?;
        Ok(())
    }

    pub fn read(&self, wallet_id: &str, secret_type: &str) -> Result<Vec<u8>, VaultError> {
        let path = self.entry_path(wallet_id, secret_type);
        fs::read(&path).map_err(|_| VaultError::NotFound)
    }

    pub fn exists(&self, wallet_id: &str, secret_type: &str) -> bool {
        self.entry_path(wallet_id, secret_type).exists()
    }

    pub fn delete(&self, wallet_id: &str, secret_type: &str) -> Result<(), VaultError> {
        let path = self.entry_path(wallet_id, secret_type);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Storage(e.to_string())),
        }
    }

    pub fn delete_all_for_wallet(&self, wallet_id: &str) -> Result<(), VaultError> {
        let prefix = format!("{}.", sanitize_component(wallet_id));
        self.delete_matching(|name| name.starts_with(&prefix))
    }

    pub fn delete_all(&self) -> Result<(), VaultError> {
        self.delete_matching(|_| true)
    }

    fn delete_matching(&self, pred: impl Fn(&str) -> bool) -> Result<(), VaultError> {
        let entries = fs::read_dir(&self.root).map_err(|e| VaultError::Storage(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::Storage(e.to_string()))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if pred(name) {
                fs::remove_file(entry.path()).map_err(|e| VaultError::Storage(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| VaultError::Storage(e.to_string()))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), VaultError> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
        .map_err(|e| VaultError::Storage(e.to_string()))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), VaultError> {
    Ok(())
}
