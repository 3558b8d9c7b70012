//! Connection state machine
//!
//! Turns connect/disconnect intents and worker outcomes into validated
//! [`ConnectionStatus`] transitions. Every accepted input yields exactly one
//! [`Transition`], which the controller turns into exactly one
//! `ConnectionChanged` notification.

use dishkit_core::{ConnectionState, ConnectionStatus, UsageError};

/// An accepted state change and its human readable reason
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Status after the change
    pub status: ConnectionStatus,
    /// Why it changed
    pub reason: String,
}

/// Lifecycle of the device link
#[derive(Debug, Clone, Default)]
pub struct ConnectionMachine {
    status: ConnectionStatus,
    endpoint: Option<String>,
}

impl ConnectionMachine {
    /// Start disconnected
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Endpoint of the current or pending connection
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Begin opening `endpoint`
    pub fn request_connect(&mut self, endpoint: &str) -> Result<Transition, UsageError> {
        self.check_pending()?;
        if self.status.state() == ConnectionState::Connected {
            return Err(UsageError::AlreadyConnected);
        }

        self.endpoint = Some(endpoint.to_string());
        Ok(self.apply(ConnectionState::Connecting, "Connecting..."))
    }

    /// Begin closing the link
    pub fn request_disconnect(&mut self) -> Result<Transition, UsageError> {
        self.check_pending()?;
        if self.status.state() == ConnectionState::Disconnected {
            return Err(UsageError::AlreadyDisconnected);
        }

        Ok(self.apply(ConnectionState::Disconnecting, "Disconnecting..."))
    }

    /// The worker opened the transport
    pub fn on_connected(&mut self) -> Option<Transition> {
        self.try_apply(ConnectionState::Connected, "Connected")
    }

    /// The worker could not open the transport
    pub fn on_connect_failed(&mut self, reason: impl Into<String>) -> Option<Transition> {
        if self.status.state() != ConnectionState::Connecting {
            return None;
        }
        let transition = self.try_apply(ConnectionState::Disconnected, reason);
        self.endpoint = None;
        transition
    }

    /// The worker closed the transport, on request or because the link died
    ///
    /// Returns `None` when already disconnected so a late close event never
    /// produces a second notification.
    pub fn on_transport_closed(&mut self, reason: impl Into<String>) -> Option<Transition> {
        match self.status.state() {
            ConnectionState::Connected | ConnectionState::Disconnecting => {
                let transition = self.try_apply(ConnectionState::Disconnected, reason);
                self.endpoint = None;
                transition
            }
            _ => None,
        }
    }

    fn check_pending(&self) -> Result<(), UsageError> {
        if self.status.is_inconsistent() {
            return Err(UsageError::RequestPending {
                state: self.status.state(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, target: ConnectionState, reason: &str) -> Transition {
        // Callers check the source state first, so this cannot be rejected.
        self.status.transition(target);
        Transition {
            status: self.status,
            reason: reason.to_string(),
        }
    }

    fn try_apply(&mut self, target: ConnectionState, reason: impl Into<String>) -> Option<Transition> {
        if !self.status.transition(target) {
            tracing::debug!(
                "Ignoring connection transition {} -> {}",
                self.status.state(),
                target
            );
            return None;
        }
        Some(Transition {
            status: self.status,
            reason: reason.into(),
        })
    }
}
