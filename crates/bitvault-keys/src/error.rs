use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("derivation failed: {0}")]
    DerivationFailed(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid extended key: {0}")]
    InvalidExtendedKey(String),

    #[error("address construction failed: {0}")]
    AddressFailed(String),

    #[error("multisig configuration invalid: {0}")]
    InvalidMultisig(String),
}
