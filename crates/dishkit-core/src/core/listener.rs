//! Dish listener interface
//!
//! Defines the listener trait for controller notifications and the registry
//! the controller uses to call listeners in registration order.

use super::event::DishEvent;
use crate::data::{Axis, ConnectionStatus, MotorState};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Handle for a registered dish listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from controller notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DishListenerHandle(pub String);

/// Listener trait for controller notifications
///
/// Implement this trait to receive state changes. Methods are called on the
/// control thread, in the order the changes happen.
pub trait DishListener: Send + Sync {
    /// Called after every connection state machine transition
    fn on_connection_changed(&self, _status: ConnectionStatus, _reason: &str) {}

    /// Called once per applied report
    fn on_motor_changed(&self, _axis: Axis, _state: &MotorState, _first_report: bool) {}

    /// Called for device error lines and recovered faults
    fn on_diagnostic(&self, _text: &str) {}
}

/// Ordered set of registered listeners
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(DishListenerHandle, Arc<dyn DishListener>)>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its handle
    pub fn register(&self, listener: Arc<dyn DishListener>) -> DishListenerHandle {
        let handle = DishListenerHandle(Uuid::new_v4().to_string());
        self.listeners.write().push((handle.clone(), listener));
        handle
    }

    /// Remove a listener; unknown handles are ignored
    pub fn unregister(&self, handle: &DishListenerHandle) {
        self.listeners.write().retain(|(h, _)| h != handle);
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// True when no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver an event to every listener
    pub fn notify(&self, event: &DishEvent) {
        let listeners: Vec<Arc<dyn DishListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            match event {
                DishEvent::ConnectionChanged { status, reason } => {
                    listener.on_connection_changed(*status, reason)
                }
                DishEvent::MotorChanged {
                    axis,
                    state,
                    first_report,
                } => listener.on_motor_changed(*axis, state, *first_report),
                DishEvent::Diagnostic(text) => listener.on_diagnostic(text),
            }
        }
    }
}
