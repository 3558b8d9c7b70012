//! Scripted in-memory transport
//!
//! A [`MockDevice`] plays the rotor: tests push lines into it, inspect the
//! commands it received, hang up the link, or make the next open fail.
//! [`MockOpener`] hands out transports wired to that device.

use super::{ReadOutcome, Transport, TransportOpener};
use dishkit_core::ConnectionError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

enum MockInput {
    Line(Vec<u8>),
    Hangup,
}

#[derive(Default)]
struct MockShared {
    incoming: Mutex<VecDeque<MockInput>>,
    arrived: Condvar,
    written: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    open_error: Mutex<Option<String>>,
    write_error: Mutex<Option<String>>,
    closes: Mutex<usize>,
}

/// Simulated rotor on the far side of a mock link
#[derive(Clone, Default)]
pub struct MockDevice {
    shared: Arc<MockShared>,
}

impl MockDevice {
    /// Create a device with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line for the controller to read; a trailing newline is optional
    pub fn push_line(&self, line: impl AsRef<[u8]>) {
        let mut bytes = line.as_ref().to_vec();
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        self.shared.incoming.lock().push_back(MockInput::Line(bytes));
        self.shared.arrived.notify_all();
    }

    /// Simulate the link dropping (zero-length read) after queued lines
    pub fn hang_up(&self) {
        self.shared.incoming.lock().push_back(MockInput::Hangup);
        self.shared.arrived.notify_all();
    }

    /// Make the next open fail with `reason`
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        *self.shared.open_error.lock() = Some(reason.into());
    }

    /// Make every write fail with `reason` until cleared with `None`
    pub fn fail_writes(&self, reason: Option<String>) {
        *self.shared.write_error.lock() = reason;
    }

    /// Commands received so far, without newlines
    pub fn written(&self) -> Vec<String> {
        self.shared.written.lock().clone()
    }

    /// Forget received commands
    pub fn clear_written(&self) {
        self.shared.written.lock().clear();
    }

    /// Endpoints opened so far
    pub fn opened(&self) -> Vec<String> {
        self.shared.opened.lock().clone()
    }

    /// Number of times a transport was closed
    pub fn close_count(&self) -> usize {
        *self.shared.closes.lock()
    }
}

/// Opens transports connected to a [`MockDevice`]
#[derive(Clone)]
pub struct MockOpener {
    device: MockDevice,
    read_timeout: Duration,
}

impl MockOpener {
    /// Create an opener for `device`
    pub fn new(device: MockDevice) -> Self {
        Self {
            device,
            read_timeout: Duration::from_millis(5),
        }
    }

    /// Override the simulated read timeout
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl TransportOpener for MockOpener {
    fn open(&self, endpoint: &str) -> Result<Box<dyn Transport>, ConnectionError> {
        if let Some(reason) = self.device.shared.open_error.lock().take() {
            return Err(ConnectionError::FailedToOpen {
                port: endpoint.to_string(),
                reason,
            });
        }

        self.device.shared.opened.lock().push(endpoint.to_string());
        Ok(Box::new(MockTransport {
            name: endpoint.to_string(),
            shared: self.device.shared.clone(),
            read_timeout: self.read_timeout,
            closed: false,
        }))
    }
}

struct MockTransport {
    name: String,
    shared: Arc<MockShared>,
    read_timeout: Duration,
    closed: bool,
}

impl Transport for MockTransport {
    fn read_line(&mut self) -> Result<ReadOutcome, ConnectionError> {
        if self.closed {
            return Ok(ReadOutcome::Closed);
        }

        let mut incoming = self.shared.incoming.lock();
        if incoming.is_empty() {
            self.shared
                .arrived
                .wait_for(&mut incoming, self.read_timeout);
        }

        Ok(match incoming.pop_front() {
            Some(MockInput::Line(line)) => ReadOutcome::Line(line),
            Some(MockInput::Hangup) => ReadOutcome::Closed,
            None => ReadOutcome::Idle,
        })
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        if let Some(reason) = self.shared.write_error.lock().clone() {
            return Err(ConnectionError::WriteFailed { reason });
        }

        let text = String::from_utf8_lossy(data);
        self.shared
            .written
            .lock()
            .push(text.trim_end_matches('\n').to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        if !self.closed {
            self.closed = true;
            *self.shared.closes.lock() += 1;
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_read_in_order() {
        let device = MockDevice::new();
        let mut transport = MockOpener::new(device.clone()).open("dev0").unwrap();

        device.push_line("I:REPORT[AZ]:1:0:0:0\n");
        device.push_line("E:oops");
        device.hang_up();

        assert_eq!(
            transport.read_line().unwrap(),
            ReadOutcome::Line(b"I:REPORT[AZ]:1:0:0:0".to_vec())
        );
        assert_eq!(transport.read_line().unwrap(), ReadOutcome::Line(b"E:oops".to_vec()));
        assert_eq!(transport.read_line().unwrap(), ReadOutcome::Closed);
        assert_eq!(device.opened(), vec!["dev0".to_string()]);
    }

    #[test]
    fn test_idle_when_nothing_queued() {
        let device = MockDevice::new();
        let mut transport = MockOpener::new(device)
            .with_read_timeout(Duration::from_millis(1))
            .open("dev0")
            .unwrap();
        assert_eq!(transport.read_line().unwrap(), ReadOutcome::Idle);
    }

    #[test]
    fn test_failures_are_scripted() {
        let device = MockDevice::new();
        let opener = MockOpener::new(device.clone());

        device.fail_next_open("busy");
        assert!(opener.open("dev0").is_err());

        let mut transport = opener.open("dev0").unwrap();
        device.fail_writes(Some("unplugged".to_string()));
        assert!(transport.write(b"ABORT\n").is_err());
        device.fail_writes(None);
        transport.write(b"ABORT\n").unwrap();
        assert_eq!(device.written(), vec!["ABORT".to_string()]);

        transport.close().unwrap();
        transport.close().unwrap();
        assert_eq!(device.close_count(), 1);
    }
}
