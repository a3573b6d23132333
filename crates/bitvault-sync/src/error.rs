use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Electrum(#[from] bitvault_electrum::ElectrumError),

    #[error(transparent)]
    Key(#[from] bitvault_keys::error::KeyError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sync already running for wallet {0}")]
    AlreadySyncing(String),

    #[error("sync was cancelled")]
    Cancelled,

    #[error("internal sync error: {0}")]
    Internal(String),
}
