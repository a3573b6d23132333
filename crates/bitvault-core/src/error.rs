//! Error taxonomy for the primitives layer.

use thiserror::Error;

/// Errors returned by encoding/decoding and signature primitives.
///
/// These are deterministic, user-correctable failures — never an
/// [`InternalError`](crate::error::PrimitiveError::Internal) unless an
/// invariant this crate itself is supposed to guarantee was broken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    #[error("invalid checksum")]
    InvalidChecksum,

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("mixed-case input is not allowed")]
    MixedCase,

    #[error("value out of range")]
    OutOfRange,

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("signature operation failed: {0}")]
    SignatureFailed(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}
