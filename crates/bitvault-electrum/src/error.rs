use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ElectrumError {
    #[error("server unreachable: {0}")]
    ServerUnreachable(String),

    #[error("TLS/handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("request timed out after {0:?}")]
    RequestTimeout(std::time::Duration),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("server version {negotiated} is below the required minimum {required}")]
    UnsupportedProtocolVersion { negotiated: String, required: String },

    #[error("request was cancelled")]
    Cancelled,

    #[error("client is shutting down")]
    Draining,

    #[error("server returned an RPC error: code {code}, message {message}")]
    RpcError { code: i64, message: String },
}

/// Diagnostic attached to a connection transitioning into `Error` state
/// (spec §4.6).
#[derive(Debug, Clone)]
pub struct ConnectionFault {
    pub host: String,
    pub port: u16,
    pub code: String,
    pub message: String,
    pub timestamp_epoch_ms: i64,
}
