//! Byte transports for the rotor link
//!
//! Provides:
//! - The [`Transport`] trait the serial worker drives
//! - [`TransportOpener`] for creating transports from an endpoint name
//! - A `serialport`-backed implementation and a scripted mock
//! - The [`worker::SerialWorker`] thread that owns an open transport

pub mod mock;
pub mod serial;
pub mod worker;

use dishkit_core::ConnectionError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of one bounded read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its terminator
    Line(Vec<u8>),
    /// The read timed out before a full line arrived
    Idle,
    /// The peer closed the link (zero-length read)
    Closed,
}

/// Line-oriented byte transport
///
/// `read_line` must return within the transport's read timeout so the worker
/// can service write and close requests between reads.
pub trait Transport: Send {
    /// Read until a newline or the read timeout
    fn read_line(&mut self) -> Result<ReadOutcome, ConnectionError>;

    /// Write raw bytes
    fn write(&mut self, data: &[u8]) -> Result<(), ConnectionError>;

    /// Release the underlying handle
    fn close(&mut self) -> Result<(), ConnectionError>;

    /// Endpoint name, for logging
    fn name(&self) -> String;
}

/// Factory for transports
pub trait TransportOpener: Send + Sync {
    /// Open `endpoint`
    fn open(&self, endpoint: &str) -> Result<Box<dyn Transport>, ConnectionError>;
}

/// Shared cancel flag for in-flight transport operations
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Split the first complete line off `buffer`, dropping the `\n`
pub(crate) fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    Some(line)
}
