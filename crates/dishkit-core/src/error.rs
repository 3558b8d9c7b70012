//! Error handling for DishKit
//!
//! Provides error types for every layer of the rotor front-end:
//! - Connection errors (byte transport)
//! - Protocol errors (malformed or out-of-range report lines)
//! - Usage errors (intents issued in an illegal state)
//! - Device errors (`E:` lines reported by the rotor firmware)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::data::{Axis, ConnectionState};
use thiserror::Error;

/// Connection error type
///
/// Represents failures at the byte-transport level: opening the port,
/// reading from it, or writing to it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// The endpoint could not be opened; `reason` is the OS error text
    #[error("Failed to connect to {port}: {reason}")]
    FailedToOpen {
        /// Endpoint that was being opened.
        port: String,
        /// Why the open failed.
        reason: String,
    },

    /// A read failed after the link was up
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The read error text.
        reason: String,
    },

    /// Write to the transport failed
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// The reason the write failed.
        reason: String,
    },

    /// Any other I/O failure, such as the worker thread failing to start
    #[error("I/O error: {reason}")]
    IoError {
        /// Error text.
        reason: String,
    },

    /// The opener was configured with an unusable baud rate
    #[error("Baud rate {baud} not supported")]
    UnsupportedBaudRate {
        /// Offending baud rate.
        baud: u32,
    },
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::IoError {
            reason: err.to_string(),
        }
    }
}

/// Protocol error type
///
/// A recognized report line whose payload cannot be applied. The offending
/// report is dropped; tracker state is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// A numeric field failed to parse
    #[error("Invalid {field} in {axis} report: '{value}'")]
    InvalidField {
        /// The axis the report was addressed to.
        axis: Axis,
        /// Field name (angle, current, status, reason).
        field: &'static str,
        /// The raw field text.
        value: String,
    },

    /// Motor status ordinal outside the known enumeration
    #[error("Status ordinal {0} out of range")]
    StatusOutOfRange(u8),

    /// Stop reason ordinal outside the known enumeration
    #[error("Reason ordinal {0} out of range")]
    ReasonOutOfRange(u8),

    /// Angle or current is NaN or infinite
    #[error("Non-finite {0} in report")]
    NonFinite(&'static str),
}

/// Usage error type
///
/// An intent was requested while the controller is in a state that does not
/// allow it. Returned synchronously; nothing changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Controller is not connected
    #[error("Serial port is not yet connected")]
    NotConnected,

    /// Controller is already connected
    #[error("Serial port is already connected")]
    AlreadyConnected,

    /// Already disconnected
    #[error("Serial port is already disconnected")]
    AlreadyDisconnected,

    /// A connect or disconnect request is still pending
    #[error("A {state} request is still pending")]
    RequestPending {
        /// The transitional state the controller is in.
        state: ConnectionState,
    },

    /// An argument cannot be sent to the rotor
    #[error("Invalid {name}: {value}")]
    InvalidValue {
        /// Argument name, e.g. `azimuth`.
        name: &'static str,
        /// The rejected value as text.
        value: String,
    },
}

/// Device error type
///
/// Free-form diagnostic text sent by the rotor in an `E:` line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DeviceError(pub String);

/// Main error type for DishKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Usage error
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Device error
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if this is a usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
