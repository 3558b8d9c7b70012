//! Connection status model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the device link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport open
    #[default]
    Disconnected,
    /// Open requested, outcome not known yet
    Connecting,
    /// Transport open, device reachable
    Connected,
    /// Close requested, worker not finished yet
    Disconnecting,
}

impl ConnectionState {
    /// Check if this state has a request in flight
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Disconnecting
        )
    }

    /// Check if a transition from this state to `target` is valid.
    ///
    /// - Disconnected → Connecting
    /// - Connecting → Connected, Disconnected (open failed)
    /// - Connected → Disconnecting, Disconnected (transport lost)
    /// - Disconnecting → Disconnected
    pub fn can_transition_to(&self, target: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Connected | Disconnected)
                | (Connected, Disconnecting | Disconnected)
                | (Disconnecting, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Connection state plus the `inconsistent` overlay flag.
///
/// `inconsistent` is true exactly while a connect or disconnect request is
/// pending. Only [`ConnectionStatus::transition`] changes either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    state: ConnectionState,
    inconsistent: bool,
}

impl ConnectionStatus {
    /// Disconnected and consistent
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a lifecycle request is pending
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    /// Shorthand for `state() == Connected`
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Move to `target`, updating the overlay flag. Returns false and leaves
    /// the status untouched for an invalid transition.
    pub fn transition(&mut self, target: ConnectionState) -> bool {
        if !self.state.can_transition_to(target) {
            return false;
        }
        self.state = target;
        self.inconsistent = target.is_transitional();
        true
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_lifecycle() {
        let mut status = ConnectionStatus::new();
        assert!(status.transition(ConnectionState::Connecting));
        assert!(status.is_inconsistent());
        assert!(status.transition(ConnectionState::Connected));
        assert!(!status.is_inconsistent());
        assert!(status.transition(ConnectionState::Disconnecting));
        assert!(status.is_inconsistent());
        assert!(status.transition(ConnectionState::Disconnected));
        assert!(!status.is_inconsistent());
    }

    #[test]
    fn test_invalid_transitions_are_refused() {
        let mut status = ConnectionStatus::new();
        assert!(!status.transition(ConnectionState::Connected));
        assert!(!status.transition(ConnectionState::Disconnecting));
        assert!(!status.transition(ConnectionState::Disconnected));
        assert_eq!(status, ConnectionStatus::new());
    }

    #[test]
    fn test_transport_loss_skips_disconnecting() {
        assert!(ConnectionState::Connected.can_transition_to(ConnectionState::Disconnected));
        assert!(!ConnectionState::Disconnecting.can_transition_to(ConnectionState::Connected));
    }
}
