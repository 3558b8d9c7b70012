//! Event system for controller notifications
//!
//! Provides:
//! - Event types for connection, motor, and diagnostic changes
//! - Event dispatcher for publishing events to subscribers

use crate::data::{Axis, ConnectionStatus, MotorState};
use tokio::sync::broadcast;

/// Notification emitted by the dish controller
#[derive(Debug, Clone, PartialEq)]
pub enum DishEvent {
    /// Connection state machine transitioned
    ConnectionChanged {
        /// Status after the transition.
        status: ConnectionStatus,
        /// Human readable reason, e.g. "Connected" or the open failure.
        reason: String,
    },
    /// A report was applied to one axis
    MotorChanged {
        /// The axis that changed.
        axis: Axis,
        /// Snapshot of the axis after the report.
        state: MotorState,
        /// True for the first report since the connection came up.
        first_report: bool,
    },
    /// Device error line or recovered transport/protocol fault
    Diagnostic(String),
}

impl std::fmt::Display for DishEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DishEvent::ConnectionChanged { status, reason } => {
                write!(f, "{} ({})", status, reason)
            }
            DishEvent::MotorChanged { axis, state, .. } => write!(
                f,
                "{}: {:.1} deg, {:.3} A, {} / {}",
                axis,
                state.angle(),
                state.current(),
                state.status(),
                state.reason()
            ),
            DishEvent::Diagnostic(text) => write!(f, "Diagnostic: {}", text),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for dish events.
    tx: broadcast::Sender<DishEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer (default 100)
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Create a new event dispatcher with default buffer size
    pub fn default_with_buffer() -> Self {
        Self::new(100)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DishEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: DishEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!("No subscribers for dish event");
                0
            }
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::default_with_buffer()
    }
}
