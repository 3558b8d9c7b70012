//! Rotor Command Creator
//!
//! Renders controller commands into the rotor's plain-text wire form.
//! Numbers use `f64`'s `Display`, which is always plain decimal.

use dishkit_core::Axis;
use std::fmt;

/// Command sent to the rotor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start unsolicited telemetry
    ReportOn,
    /// Stop unsolicited telemetry
    ReportOff,
    /// Move both axes to absolute angles (degrees)
    Goto {
        /// Azimuth target
        az: f64,
        /// Elevation target
        el: f64,
    },
    /// Move both axes at constant rates
    Velocity {
        /// Azimuth rate
        az: f64,
        /// Elevation rate
        el: f64,
    },
    /// Stop any motion in progress
    Abort,
    /// Set one axis' overcurrent protection threshold (amps)
    Overcurrent {
        /// Axis the limit applies to
        axis: Axis,
        /// Threshold in amps
        limit: f64,
    },
}

impl Command {
    /// Wire bytes, newline terminated
    pub fn encode(&self) -> Vec<u8> {
        format!("{}\n", self).into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReportOn => write!(f, "REPORT ON"),
            Self::ReportOff => write!(f, "REPORT OFF"),
            Self::Goto { az, el } => write!(f, "GOTO {} {}", az, el),
            Self::Velocity { az, el } => write!(f, "VH {} {}", az, el),
            Self::Abort => write!(f, "ABORT"),
            Self::Overcurrent { axis, limit } => write!(f, "OVERCURRENT {} {}", axis, limit),
        }
    }
}
