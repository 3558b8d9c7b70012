//! Motor state tracker
//!
//! Holds one axis's last reported angle, smoothed motor current, status and
//! stop reason.

use super::{MotorStatus, StopReason};
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Current value meaning "never reported since the last connection"
pub const CURRENT_SENTINEL: f64 = -2.0;

/// Currents below this threshold indicate an unpowered or faulted axis
pub const FAULT_CURRENT_THRESHOLD: f64 = -0.5;

/// Weight of a new current sample in the exponential filter
const CURRENT_SMOOTHING: f64 = 0.1;

/// State of a single rotor axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorState {
    angle: f64,
    current: f64,
    status: MotorStatus,
    reason: StopReason,
    first_report_seen: bool,
}

impl MotorState {
    /// Create a tracker in its never-reported state
    pub fn new() -> Self {
        Self {
            angle: 0.0,
            current: CURRENT_SENTINEL,
            status: MotorStatus::Idle,
            reason: StopReason::Ok,
            first_report_seen: false,
        }
    }

    /// Last reported absolute angle in degrees
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Smoothed motor current in amps
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Last reported motor status
    pub fn status(&self) -> MotorStatus {
        self.status
    }

    /// Last reported stop reason
    pub fn reason(&self) -> StopReason {
        self.reason
    }

    /// Whether a report arrived since the last connection
    pub fn first_report_seen(&self) -> bool {
        self.first_report_seen
    }

    /// True iff the smoothed current is below the fault threshold
    pub fn is_fault(&self) -> bool {
        self.current < FAULT_CURRENT_THRESHOLD
    }

    /// Apply one report from the device.
    ///
    /// Numbers and ordinals are validated before anything is written, so a
    /// rejected report leaves the tracker untouched. The first report after a reset filters
    /// from a zero baseline instead of the sentinel.
    pub fn apply_report(
        &mut self,
        angle: f64,
        current: f64,
        status: u8,
        reason: u8,
    ) -> Result<(), ProtocolError> {
        if !angle.is_finite() {
            return Err(ProtocolError::NonFinite("angle"));
        }
        if !current.is_finite() {
            return Err(ProtocolError::NonFinite("current"));
        }
        let status = MotorStatus::try_from(status)?;
        let reason = StopReason::try_from(reason)?;

        let previous = if self.first_report_seen {
            self.current
        } else {
            0.0
        };

        self.angle = angle;
        self.current = previous + CURRENT_SMOOTHING * (current - previous);
        self.status = status;
        self.reason = reason;
        self.first_report_seen = true;

        Ok(())
    }

    /// Forget the previous connection's telemetry
    pub fn reset(&mut self) {
        self.first_report_seen = false;
        self.current = CURRENT_SENTINEL;
    }
}

impl Default for MotorState {
    fn default() -> Self {
        Self::new()
    }
}
