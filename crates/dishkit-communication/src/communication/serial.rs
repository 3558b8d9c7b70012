//! Serial port transport
//!
//! The rotor controller board talks 8N1 over USB CDC or a USB-serial adapter.
//! Reads are bounded by the port timeout so the worker can interleave writes.

use super::{take_line, ReadOutcome, Transport, TransportOpener};
use dishkit_core::{ConnectionError, Error, Result};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Default line speed of the rotor controller
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Longest partial line kept while waiting for its `\n`
const MAX_PENDING_LINE: usize = 4096;

/// A serial port that may have the rotor controller behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialPortInfo {
    /// Device path or name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port_name: String,
    /// Human readable summary for port pickers
    pub description: String,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB serial number
    pub serial_number: Option<String>,
    /// USB vendor and product IDs
    pub usb_ids: Option<(u16, u16)>,
}

impl From<&serialport::SerialPortInfo> for SerialPortInfo {
    fn from(port: &serialport::SerialPortInfo) -> Self {
        let mut info = Self {
            port_name: port.port_name.clone(),
            description: port_description(port),
            manufacturer: None,
            serial_number: None,
            usb_ids: None,
        };
        if let serialport::SerialPortType::UsbPort(usb) = &port.port_type {
            info.manufacturer = usb.manufacturer.clone();
            info.serial_number = usb.serial_number.clone();
            info.usb_ids = Some((usb.vid, usb.pid));
        }
        info
    }
}

/// List serial ports that look like a rotor controller
///
/// USB CDC and USB-serial adapters only: `COMn` on Windows, `ttyUSB`/`ttyACM`
/// on Linux, `cu.usbserial-`/`cu.usbmodem` on macOS.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Serial port enumeration failed: {}", e);
        Error::other(format!("Cannot enumerate serial ports: {}", e))
    })?;

    let found: Vec<SerialPortInfo> = ports
        .iter()
        .filter(|port| is_candidate_port(&port.port_name))
        .map(SerialPortInfo::from)
        .collect();
    tracing::debug!("{} of {} serial ports are candidates", found.len(), ports.len());
    Ok(found)
}

fn is_candidate_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => match (&usb.manufacturer, &usb.product) {
            (Some(vendor), Some(product)) => format!("{} {}", vendor, product),
            (None, Some(product)) => product.clone(),
            (Some(vendor), None) => format!("{} USB serial", vendor),
            (None, None) => format!("USB serial {:04x}:{:04x}", usb.vid, usb.pid),
        },
        serialport::SerialPortType::PciPort => "PCI serial".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        _ => "serial".to_string(),
    }
}

/// Opens [`SerialTransport`]s with fixed line settings
#[derive(Debug, Clone)]
pub struct SerialOpener {
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialOpener {
    /// Create an opener for the given baud rate and read timeout
    pub fn new(baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            baud_rate,
            read_timeout,
        }
    }
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE, Duration::from_millis(50))
    }
}

impl TransportOpener for SerialOpener {
    fn open(&self, endpoint: &str) -> std::result::Result<Box<dyn Transport>, ConnectionError> {
        if self.baud_rate == 0 {
            return Err(ConnectionError::UnsupportedBaudRate {
                baud: self.baud_rate,
            });
        }

        let port = serialport::new(endpoint, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", endpoint, e);
                ConnectionError::FailedToOpen {
                    port: endpoint.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!("Opened serial port {} at {} baud", endpoint, self.baud_rate);
        Ok(Box::new(SerialTransport::new(endpoint, port)))
    }
}

/// Serial port transport backed by the `serialport` crate
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
    buffer: Vec<u8>,
}

impl SerialTransport {
    /// Wrap an already opened port
    pub fn new(name: impl Into<String>, port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            name: name.into(),
            port: Some(port),
            buffer: Vec::new(),
        }
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self) -> std::result::Result<ReadOutcome, ConnectionError> {
        if let Some(line) = take_line(&mut self.buffer) {
            return Ok(ReadOutcome::Line(line));
        }

        let Some(port) = self.port.as_mut() else {
            return Ok(ReadOutcome::Closed);
        };

        let mut chunk = [0u8; 256];
        match port.read(&mut chunk) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => Ok(buffer_chunk(&mut self.buffer, &chunk[..n], &self.name)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(ReadOutcome::Idle)
            }
            Err(e) => Err(ConnectionError::ConnectionLost {
                reason: e.to_string(),
            }),
        }
    }

    fn write(&mut self, data: &[u8]) -> std::result::Result<(), ConnectionError> {
        let port = self.port.as_mut().ok_or_else(|| ConnectionError::WriteFailed {
            reason: format!("{} is closed", self.name),
        })?;

        port.write_all(data)
            .and_then(|_| port.flush())
            .map_err(|e| ConnectionError::WriteFailed {
                reason: e.to_string(),
            })
    }

    fn close(&mut self) -> std::result::Result<(), ConnectionError> {
        if self.port.take().is_some() {
            tracing::debug!("Closed serial port {}", self.name);
        }
        self.buffer.clear();
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Append freshly read bytes and pop the first complete line, if any.
///
/// A partial line longer than [`MAX_PENDING_LINE`] is dropped.
fn buffer_chunk(buffer: &mut Vec<u8>, chunk: &[u8], name: &str) -> ReadOutcome {
    buffer.extend_from_slice(chunk);
    if let Some(line) = take_line(buffer) {
        return ReadOutcome::Line(line);
    }
    if buffer.len() > MAX_PENDING_LINE {
        tracing::warn!(
            "Dropping {} bytes without a line ending from {}",
            buffer.len(),
            name
        );
        buffer.clear();
    }
    ReadOutcome::Idle
}
