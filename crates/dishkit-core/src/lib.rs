//! # DishKit Core
//!
//! Core types, errors, and events shared by the DishKit crates.
//! Provides the per-axis motor state tracker, the connection status model,
//! and the notification types handed to presentation layers.

pub mod core;
pub mod data;
pub mod error;

pub use crate::core::{
    event::{DishEvent, EventDispatcher},
    listener::{DishListener, DishListenerHandle, ListenerRegistry},
};

pub use crate::data::{
    Axis, ConnectionState, ConnectionStatus, MotorState, MotorStatus, OvercurrentLimits,
    StopReason, CURRENT_SENTINEL, FAULT_CURRENT_THRESHOLD,
};

pub use crate::error::{ConnectionError, DeviceError, Error, ProtocolError, Result, UsageError};
