//! Connection state machine (spec §4.6).

use crate::error::ConnectionFault;

#[derive(Debug, Clone)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    Draining,
    Error(ConnectionFault),
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Ready => "ready",
            ConnectionState::Draining => "draining",
            ConnectionState::Error(_) => "error",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    /// Whether a transition from `self` to `next` is legal per the FSM in
    /// spec §4.6. `Error` is reachable from any state (transport fault or
    /// protocol violation can happen anywhere).
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        use ConnectionState::*;
        if matches!(next, Error(_)) {
            return true;
        }
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Handshaking)
                | (Handshaking, Ready)
                | (Ready, Draining)
                | (Draining, Ready)
                | (Draining, Disconnected)
                | (Error(_), Connecting)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_to_connecting_is_legal() {
        assert!(ConnectionState::Disconnected.can_transition_to(&ConnectionState::Connecting));
    }

    #[test]
    fn disconnected_to_ready_is_illegal() {
        assert!(!ConnectionState::Disconnected.can_transition_to(&ConnectionState::Ready));
    }

    #[test]
    fn any_state_can_transition_to_error() {
        let fault = ConnectionFault {
            host: "h".to_string(),
            port: 1,
            code: "x".to_string(),
            message: "m".to_string(),
            timestamp_epoch_ms: 0,
        };
        assert!(ConnectionState::Ready.can_transition_to(&ConnectionState::Error(fault.clone())));
        assert!(ConnectionState::Handshaking.can_transition_to(&ConnectionState::Error(fault)));
    }

    #[test]
    fn ready_and_draining_toggle() {
        assert!(ConnectionState::Ready.can_transition_to(&ConnectionState::Draining));
        assert!(ConnectionState::Draining.can_transition_to(&ConnectionState::Ready));
    }
}
