use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("invalid character in descriptor: {0:?}")]
    InvalidCharacter(char),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("malformed checksum suffix")]
    MalformedChecksum,

    #[error("unbalanced brackets")]
    UnbalancedBrackets,

    #[error("unsupported descriptor function: {0}")]
    UnsupportedFunction(String),

    #[error("malformed key expression: {0}")]
    MalformedKeyExpression(String),

    #[error("malformed multisig threshold: {0}")]
    MalformedThreshold(String),

    #[error("empty descriptor")]
    Empty,

    #[error("trailing data after descriptor: {0:?}")]
    TrailingData(String),
}
