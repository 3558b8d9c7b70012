//! Data models for the rotor axes and the device link
//!
//! This module provides:
//! - Axis identifiers (azimuth, elevation)
//! - Motor status and stop reason enumerations as reported by the firmware
//! - The per-axis motor state tracker
//! - Connection status with its transitional `inconsistent` overlay
//! - Overcurrent limits sent to the device on connect

pub mod connection;
pub mod motor;

pub use connection::{ConnectionState, ConnectionStatus};
pub use motor::{MotorState, CURRENT_SENTINEL, FAULT_CURRENT_THRESHOLD};

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Azimuth
    #[serde(rename = "AZ")]
    Az,
    /// Elevation
    #[serde(rename = "EL")]
    El,
}

impl Axis {
    /// Both axes, azimuth first
    pub const ALL: [Axis; 2] = [Axis::Az, Axis::El];

    /// Wire tag used in report subcommands and overcurrent commands
    pub fn tag(&self) -> &'static str {
        match self {
            Axis::Az => "AZ",
            Axis::El => "EL",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Motor status as reported by the rotor firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MotorStatus {
    /// No command in progress
    #[default]
    Idle,
    /// Command acknowledged
    Ack,
    /// Motor is moving
    Running,
    /// Last command finished
    Finalized,
}

impl MotorStatus {
    /// Check if the motor is moving
    pub fn is_running(&self) -> bool {
        matches!(self, MotorStatus::Running)
    }
}

impl TryFrom<u8> for MotorStatus {
    type Error = ProtocolError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Ack),
            2 => Ok(Self::Running),
            3 => Ok(Self::Finalized),
            other => Err(ProtocolError::StatusOutOfRange(other)),
        }
    }
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Ack => write!(f, "ACK"),
            Self::Running => write!(f, "RUNNING"),
            Self::Finalized => write!(f, "FINALIZED"),
        }
    }
}

/// Reason the last motion ended, as reported by the rotor firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StopReason {
    /// Completed normally
    #[default]
    Ok,
    /// Aborted on request
    Aborted,
    /// Motion timed out
    Timeout,
    /// Limit switch reached
    Limit,
    /// Overcurrent protection tripped
    Over,
    /// No command received
    NoCmd,
    /// Motor did not move
    Still,
}

impl StopReason {
    /// Check if this reason signals a problem
    pub fn is_error(&self) -> bool {
        !matches!(self, StopReason::Ok)
    }
}

impl TryFrom<u8> for StopReason {
    type Error = ProtocolError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Aborted),
            2 => Ok(Self::Timeout),
            3 => Ok(Self::Limit),
            4 => Ok(Self::Over),
            5 => Ok(Self::NoCmd),
            6 => Ok(Self::Still),
            other => Err(ProtocolError::ReasonOutOfRange(other)),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Aborted => write!(f, "ABORTED"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Limit => write!(f, "LIMIT"),
            Self::Over => write!(f, "OVER"),
            Self::NoCmd => write!(f, "NOCMD"),
            Self::Still => write!(f, "STILL"),
        }
    }
}

/// Per-axis overcurrent limits in amps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvercurrentLimits {
    /// Azimuth motor limit
    pub az: f64,
    /// Elevation motor limit
    pub el: f64,
}

impl OvercurrentLimits {
    /// Create a new pair of limits
    pub fn new(az: f64, el: f64) -> Self {
        Self { az, el }
    }

    /// Limit for a single axis
    pub fn for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Az => self.az,
            Axis::El => self.el,
        }
    }
}

impl Default for OvercurrentLimits {
    fn default() -> Self {
        Self { az: 1.5, el: 1.5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordinals() {
        assert_eq!(MotorStatus::try_from(0), Ok(MotorStatus::Idle));
        assert_eq!(MotorStatus::try_from(2), Ok(MotorStatus::Running));
        assert_eq!(MotorStatus::try_from(3), Ok(MotorStatus::Finalized));
        assert_eq!(
            MotorStatus::try_from(4),
            Err(ProtocolError::StatusOutOfRange(4))
        );
    }

    #[test]
    fn test_reason_ordinals() {
        assert_eq!(StopReason::try_from(0), Ok(StopReason::Ok));
        assert_eq!(StopReason::try_from(5), Ok(StopReason::NoCmd));
        assert_eq!(StopReason::try_from(6), Ok(StopReason::Still));
        assert_eq!(
            StopReason::try_from(7),
            Err(ProtocolError::ReasonOutOfRange(7))
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(MotorStatus::Ack.to_string(), "ACK");
        assert_eq!(StopReason::NoCmd.to_string(), "NOCMD");
        assert_eq!(Axis::El.to_string(), "EL");
    }

    #[test]
    fn test_limits_for_axis() {
        let limits = OvercurrentLimits::new(1.0, 2.5);
        assert_eq!(limits.for_axis(Axis::Az), 1.0);
        assert_eq!(limits.for_axis(Axis::El), 2.5);
    }
}
