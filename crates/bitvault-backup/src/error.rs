use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("invalid password or corrupted backup")]
    InvalidPasswordOrCorrupted,

    #[error("backup format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("backup blob is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("backup payload is not valid JSON: {0}")]
    Serialization(String),

    #[error("vault error: {0}")]
    Vault(#[from] bitvault_vault::VaultError),
}
