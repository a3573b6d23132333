use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxError {
    #[error("no combination of available UTXOs covers the target amount plus fee")]
    InsufficientFunds,

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("PSBT is not yet complete, cannot finalize")]
    IncompletePsbt,

    #[error("original transaction does not signal RBF (sequence not < 0xfffffffe)")]
    NotReplaceable,

    #[error("replacement fee rate must be strictly higher than the original")]
    FeeNotIncreased,

    #[error("parent output is already spent or would be dust after the bump")]
    InvalidCpfpTarget,

    #[error("invalid BIP21 URI: {0}")]
    InvalidBip21(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Key(#[from] bitvault_keys::error::KeyError),

    #[error(transparent)]
    Vault(#[from] bitvault_vault::error::VaultError),

    #[error(transparent)]
    Electrum(#[from] bitvault_electrum::ElectrumError),

    #[error("PSBT error: {0}")]
    Psbt(String),

    #[error("internal error: {0}")]
    Internal(String),
}
