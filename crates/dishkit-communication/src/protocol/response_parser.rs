//! Rotor Response Parser
//!
//! Decodes one raw line received from the rotor into a typed [`Message`].
//! Decoding never fails: noise, partial lines and unknown messages map to
//! sentinel variants the controller ignores.

use dishkit_core::{Axis, ProtocolError};

/// Telemetry for one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisReport {
    /// Axis the report belongs to
    pub axis: Axis,
    /// Absolute angle in degrees
    pub angle: f64,
    /// Instantaneous motor current in amps
    pub current: f64,
    /// Raw motor status ordinal
    pub status: u8,
    /// Raw stop reason ordinal
    pub reason: u8,
}

/// Decoded rotor line
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `I:REPORT[AZ]` / `I:REPORT[EL]` with four fields
    Report(AxisReport),
    /// Any other info line, kept for logging only
    Info {
        /// Second field of the line
        subcommand: String,
        /// Remaining fields
        fields: Vec<String>,
    },
    /// `E:` line; remaining fields rejoined with `:`
    ErrorReport(String),
    /// Recognized report whose payload did not parse
    Invalid(ProtocolError),
    /// Too few fields or unknown message class
    Discard,
}

/// Number of payload fields in a report line
const REPORT_FIELDS: usize = 4;

/// Decode one raw line
pub fn decode(raw: &[u8]) -> Message {
    let text = String::from_utf8_lossy(raw);
    let fields: Vec<&str> = text.trim().split(':').collect();

    if fields.len() < 2 {
        return Message::Discard;
    }

    match fields[0] {
        "I" => decode_info(fields[1], &fields[2..]),
        "E" => Message::ErrorReport(fields[1..].join(":")),
        _ => Message::Discard,
    }
}

fn decode_info(subcommand: &str, fields: &[&str]) -> Message {
    let axis = match subcommand {
        "REPORT[AZ]" => Some(Axis::Az),
        "REPORT[EL]" => Some(Axis::El),
        _ => None,
    };

    match axis {
        Some(axis) if fields.len() == REPORT_FIELDS => match parse_report(axis, fields) {
            Ok(report) => Message::Report(report),
            Err(err) => Message::Invalid(err),
        },
        _ => Message::Info {
            subcommand: subcommand.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        },
    }
}

fn parse_report(axis: Axis, fields: &[&str]) -> Result<AxisReport, ProtocolError> {
    Ok(AxisReport {
        axis,
        angle: parse_number(axis, "angle", fields[0])?,
        current: parse_number(axis, "current", fields[1])?,
        status: parse_field(axis, "status", fields[2])?,
        reason: parse_field(axis, "reason", fields[3])?,
    })
}

fn parse_field<T: std::str::FromStr>(
    axis: Axis,
    field: &'static str,
    value: &str,
) -> Result<T, ProtocolError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ProtocolError::InvalidField {
            axis,
            field,
            value: value.to_string(),
        })
}

/// `f64::from_str` also accepts `nan` and `inf`, which would poison the
/// current filter for the rest of the connection.
fn parse_number(axis: Axis, field: &'static str, value: &str) -> Result<f64, ProtocolError> {
    let number: f64 = parse_field(axis, field, value)?;
    if !number.is_finite() {
        return Err(ProtocolError::InvalidField {
            axis,
            field,
            value: value.to_string(),
        });
    }
    Ok(number)
}
