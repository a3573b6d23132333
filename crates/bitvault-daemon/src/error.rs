//! The unified error taxonomy (spec §7). Every library crate below this
//! one defines its own narrow `thiserror` enum; this is where those
//! collapse into the kinds the UI boundary actually dispatches on.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidPin,
    Locked { remaining_secs: u64 },
    BiometricUnavailable,
    BiometricCancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkErrorKind {
    ServerUnreachable(String),
    HandshakeFailed(String),
    RequestTimeout,
    ProtocolViolation(String),
}

/// `StateError` in spec §7: reset exclusivity and coordinator invariants,
/// distinct from `InternalError` because a caller can legitimately hit
/// these (e.g. retry after a reset completes) rather than it indicating a
/// broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateErrorKind {
    ResetInProgress,
    NotInitialized,
    /// Always unreachable on this mainnet-only build (spec §1 Non-goals);
    /// kept so the taxonomy matches spec §7 exactly.
    WrongNetwork,
    WalletNotFound(String),
    NoActiveWallet,
    ResetVerificationFailed,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Never surfaces which of PIN-wrong vs tag-mismatch occurred — see
    /// `bitvault_vault::VaultError::InvalidPinOrTampered`.
    #[error("authentication error: {0:?}")]
    AuthError(AuthErrorKind),

    /// A developer error: the UI should have gated this operation on
    /// `Capabilities` before dispatching it.
    #[error("operation not permitted by this wallet's capabilities: {0}")]
    CapabilityDenied(String),

    #[error("network error: {0:?}")]
    NetworkError(NetworkErrorKind),

    /// Electrum response violated the expected schema; fatal for the
    /// connection that produced it.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("state error: {0:?}")]
    StateError(StateErrorKind),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn wallet_not_found(id: impl Into<String>) -> Self {
        CoreError::StateError(StateErrorKind::WalletNotFound(id.into()))
    }

    pub fn no_active_wallet() -> Self {
        CoreError::StateError(StateErrorKind::NoActiveWallet)
    }

    pub fn reset_in_progress() -> Self {
        CoreError::StateError(StateErrorKind::ResetInProgress)
    }

    pub fn reset_verification_failed() -> Self {
        CoreError::StateError(StateErrorKind::ResetVerificationFailed)
    }
}

impl From<bitvault_vault::VaultError> for CoreError {
    fn from(e: bitvault_vault::VaultError) -> Self {
        use bitvault_vault::VaultError as V;
        match e {
            V::InvalidPinOrTampered => CoreError::AuthError(AuthErrorKind::InvalidPin),
            V::Locked { remaining_secs } => CoreError::AuthError(AuthErrorKind::Locked { remaining_secs }),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<bitvault_electrum::ElectrumError> for CoreError {
    fn from(e: bitvault_electrum::ElectrumError) -> Self {
        use bitvault_electrum::ElectrumError as E;
        match e {
            E::ServerUnreachable(m) => CoreError::NetworkError(NetworkErrorKind::ServerUnreachable(m)),
            E::HandshakeFailed(m) => CoreError::NetworkError(NetworkErrorKind::HandshakeFailed(m)),
            E::RequestTimeout(_) => CoreError::NetworkError(NetworkErrorKind::RequestTimeout),
            E::ProtocolViolation(m) => CoreError::ProtocolError(m),
            E::UnsupportedProtocolVersion { negotiated, required } => {
                CoreError::NetworkError(NetworkErrorKind::HandshakeFailed(format!(
                    "negotiated {negotiated}, required {required}"
                )))
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<bitvault_descriptors::DescriptorError> for CoreError {
    fn from(e: bitvault_descriptors::DescriptorError) -> Self {
        CoreError::InvalidInput(e.to_string())
    }
}

impl From<bitvault_keys::error::KeyError> for CoreError {
    fn from(e: bitvault_keys::error::KeyError) -> Self {
        CoreError::InvalidInput(e.to_string())
    }
}

impl From<bitvault_wallet::WalletError> for CoreError {
    fn from(e: bitvault_wallet::WalletError) -> Self {
        use bitvault_wallet::WalletError as W;
        match e {
            W::CapabilityDenied(m) => CoreError::CapabilityDenied(m),
            W::UnrecognizedFormat => CoreError::InvalidInput("unrecognized import payload".to_string()),
            W::InvalidPayload(m) => CoreError::InvalidInput(m),
            W::NotFound(id) => CoreError::wallet_not_found(id),
            W::Key(k) => k.into(),
            W::Descriptor(d) => d.into(),
            W::Vault(v) => v.into(),
            W::Internal(m) => CoreError::Internal(m),
        }
    }
}

impl From<bitvault_tx::TxError> for CoreError {
    fn from(e: bitvault_tx::TxError) -> Self {
        use bitvault_tx::TxError as T;
        match e {
            T::PolicyViolation(m) => CoreError::PolicyViolation(m),
            T::InvalidBip21(m) | T::InvalidAddress(m) => CoreError::InvalidInput(m),
            T::Key(k) => k.into(),
            T::Vault(v) => v.into(),
            T::Electrum(n) => n.into(),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<bitvault_sync::SyncError> for CoreError {
    fn from(e: bitvault_sync::SyncError) -> Self {
        use bitvault_sync::SyncError as S;
        match e {
            S::Electrum(n) => n.into(),
            S::Key(k) => k.into(),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<bitvault_backup::BackupError> for CoreError {
    fn from(e: bitvault_backup::BackupError) -> Self {
        use bitvault_backup::BackupError as B;
        match e {
            B::InvalidPasswordOrCorrupted => CoreError::AuthError(AuthErrorKind::InvalidPin),
            B::Vault(v) => v.into(),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pin_and_tampered_map_to_the_same_auth_error() {
        let a: CoreError = bitvault_vault::VaultError::InvalidPinOrTampered.into();
        assert!(matches!(a, CoreError::AuthError(AuthErrorKind::InvalidPin)));
    }

    #[test]
    fn lockout_carries_remaining_seconds_through() {
        let e: CoreError = bitvault_vault::VaultError::Locked { remaining_secs: 42 }.into();
        assert!(matches!(e, CoreError::AuthError(AuthErrorKind::Locked { remaining_secs: 42 })));
    }

    #[test]
    fn capability_denied_passes_through_from_wallet_error() {
        let e: CoreError = bitvault_wallet::WalletError::CapabilityDenied("sign".to_string()).into();
        assert!(matches!(e, CoreError::CapabilityDenied(m) if m == "sign"));
    }
}
