//! Console front-end
//!
//! Parses operator commands and renders controller state as text. The binary
//! in `main.rs` only wires these to stdin, stdout and the controller.

use dishkit_communication::{DishController, SerialPortInfo};
use dishkit_core::{Axis, ConnectionStatus, DishEvent, MotorState};
use serde_json::json;
use thiserror::Error;

/// Help text printed by `help`
pub const HELP: &str = "\
commands:
  connect [port]      open the serial port (default from config)
  disconnect          stop reports and close the port
  goto <az> <el>      move to absolute angles in degrees
  advance <daz> <del> move relative to the last reported angles
  vh <az> <el>        move at constant rates
  abort               stop any motion
  limits <az> <el>    set overcurrent limits in amps
  status              print a JSON snapshot
  ports               list candidate serial ports
  quit                shut down and exit";

/// One operator command
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Open a port, or the configured one
    Connect(Option<String>),
    /// Close the link
    Disconnect,
    /// Absolute move
    Goto(f64, f64),
    /// Relative move
    Advance(f64, f64),
    /// Constant rate move
    Velocity(f64, f64),
    /// Stop motion
    Abort,
    /// New overcurrent limits
    Limits(f64, f64),
    /// Print a snapshot
    Status,
    /// List serial ports
    Ports,
    /// Print help
    Help,
    /// Exit
    Quit,
}

/// Command line parse failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Command word not recognized
    #[error("Unknown command '{0}' (try 'help')")]
    Unknown(String),

    /// Wrong number of arguments
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// An argument is not a number
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "connect" => match args.as_slice() {
            [] => ConsoleCommand::Connect(None),
            [port] => ConsoleCommand::Connect(Some(port.to_string())),
            _ => return Err(CommandError::Usage("connect [port]")),
        },
        "disconnect" => ConsoleCommand::Disconnect,
        "goto" => {
            let (az, el) = two_numbers(&args, "goto <az> <el>")?;
            ConsoleCommand::Goto(az, el)
        }
        "advance" => {
            let (az, el) = two_numbers(&args, "advance <daz> <del>")?;
            ConsoleCommand::Advance(az, el)
        }
        "vh" => {
            let (az, el) = two_numbers(&args, "vh <az> <el>")?;
            ConsoleCommand::Velocity(az, el)
        }
        "abort" | "stop" => ConsoleCommand::Abort,
        "limits" => {
            let (az, el) = two_numbers(&args, "limits <az> <el>")?;
            ConsoleCommand::Limits(az, el)
        }
        "status" => ConsoleCommand::Status,
        "ports" => ConsoleCommand::Ports,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn two_numbers(args: &[&str], usage: &'static str) -> Result<(f64, f64), CommandError> {
    match args {
        [a, b] => Ok((number(a)?, number(b)?)),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn number(text: &str) -> Result<f64, CommandError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::NotANumber(text.to_string()))
}

/// One axis as a status line
///
/// Shows placeholders while disconnected and `POWER DOWN` for a faulted
/// axis. Small negative currents are shown as zero.
pub fn format_motor(axis: Axis, state: &MotorState, status: ConnectionStatus) -> String {
    if !status.is_connected() {
        return format!("{}: ???.? deg  N/A  N/A  N/A", axis);
    }

    let current = if state.is_fault() {
        "POWER DOWN".to_string()
    } else {
        format!("{:.3} A", state.current().max(0.0))
    };

    format!(
        "{}: {:.1} deg  {}  {}  {}",
        axis,
        state.angle(),
        state.status(),
        state.reason(),
        current
    )
}

/// Text for one notification, or `None` when it should not be printed
pub fn render_event(
    event: &DishEvent,
    link: ConnectionStatus,
    show_reports: bool,
) -> Option<String> {
    match event {
        DishEvent::ConnectionChanged { status, reason } => {
            Some(format!("[{}] {}", status, reason))
        }
        DishEvent::MotorChanged { axis, state, .. } if show_reports => {
            Some(format_motor(*axis, state, link))
        }
        DishEvent::MotorChanged { .. } => None,
        DishEvent::Diagnostic(text) => Some(format!("! {}", text)),
    }
}

/// JSON snapshot of the controller for `status`
pub fn status_json(controller: &DishController) -> serde_json::Value {
    let status = controller.connection_status();
    json!({
        "connection": {
            "state": status.state(),
            "inconsistent": status.is_inconsistent(),
            "endpoint": controller.endpoint(),
        },
        "limits": controller.overcurrent_limits(),
        "az": motor_json(&controller.motor(Axis::Az)),
        "el": motor_json(&controller.motor(Axis::El)),
    })
}

fn motor_json(state: &MotorState) -> serde_json::Value {
    json!({
        "angle": state.angle(),
        "current": state.current(),
        "status": state.status(),
        "reason": state.reason(),
        "fault": state.is_fault(),
    })
}

/// Port list for `ports`
pub fn format_ports(ports: &[SerialPortInfo]) -> String {
    if ports.is_empty() {
        return "no serial ports found".to_string();
    }
    ports
        .iter()
        .map(|p| format!("{}  {}", p.port_name, p.description))
        .collect::<Vec<_>>()
        .join("\n")
}
