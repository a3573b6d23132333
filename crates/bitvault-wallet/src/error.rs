use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("unrecognized import payload")]
    UnrecognizedFormat,

    #[error("invalid import payload: {0}")]
    InvalidPayload(String),

    #[error("wallet not found: {0}")]
    NotFound(String),

    #[error("operation not permitted by this wallet's capabilities: {0}")]
    CapabilityDenied(String),

    #[error(transparent)]
    Key(#[from] bitvault_keys::error::KeyError),

    #[error(transparent)]
    Descriptor(#[from] bitvault_descriptors::DescriptorError),

    #[error(transparent)]
    Vault(#[from] bitvault_vault::VaultError),

    #[error("internal wallet error: {0}")]
    Internal(String),
}
