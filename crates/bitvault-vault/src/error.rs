use thiserror::Error;

/// Errors surfaced across the vault boundary. Deliberately coarse where
/// the spec requires it: an `InvalidPin` is indistinguishable from a
/// `Tampered` ciphertext to any caller outside this crate.
#[derive(Error, Debug)]
pub enum VaultError {
    /// PIN did not authenticate, or the AEAD tag did not verify. These two
    /// cases are folded into one variant deliberately.
    #[error("invalid PIN or tampered secret")]
    InvalidPinOrTampered,

    #[error("wallet has no secret of this type stored")]
    NotFound,

    #[error("account is locked for {remaining_secs} more seconds")]
    Locked { remaining_secs: u64 },

    #[error("cosigner index out of range: {0} (must be 0-14)")]
    InvalidCosignerIndex(u8),

    #[error("storage I/O error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal vault error: {0}")]
    Internal(String),
}
