//! Configuration for the DishKit console
//!
//! Supports JSON and TOML files; the format is picked from the extension.
//! Configuration is organized into sections:
//! - Connection settings (port, baud rate, read timeout)
//! - Overcurrent limits sent to the rotor on connect
//! - Console preferences

use crate::error::{SettingsError, SettingsResult};
use dishkit_core::OvercurrentLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port to open
    pub port: String,
    /// Baud rate; framing is always 8N1
    pub baud_rate: u32,
    /// Upper bound on a single blocking read in milliseconds
    pub read_timeout_ms: u64,
    /// Connect to `port` when the console starts
    pub auto_connect: bool,
}

impl ConnectionSettings {
    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            read_timeout_ms: 50,
            auto_connect: false,
        }
    }
}

/// Overcurrent thresholds in amps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Azimuth motor limit
    pub az: f64,
    /// Elevation motor limit
    pub el: f64,
}

impl LimitSettings {
    /// Limits in the form the controller takes them
    pub fn to_limits(&self) -> OvercurrentLimits {
        OvercurrentLimits::new(self.az, self.el)
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        let limits = OvercurrentLimits::default();
        Self {
            az: limits.az,
            el: limits.el,
        }
    }
}

/// Console preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Prompt printed before each command
    pub prompt: String,
    /// Print every motor report, not only connection changes and diagnostics
    pub show_reports: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            prompt: "dish> ".to_string(),
            show_reports: true,
        }
    }
}

/// Complete console configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Overcurrent limits
    pub limits: LimitSettings,
    /// Console preferences
    pub console: ConsoleSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/dishkit/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(dir.join("dishkit").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path`, or defaults when it does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            tracing::info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        std::fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.connection.port.trim().is_empty() {
            return Err(SettingsError::invalid("connection.port", "must not be empty"));
        }

        if self.connection.baud_rate == 0 {
            return Err(SettingsError::invalid("connection.baud_rate", "must be > 0"));
        }

        if self.connection.read_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "connection.read_timeout_ms",
                "must be > 0",
            ));
        }

        for (key, value) in [("limits.az", self.limits.az), ("limits.el", self.limits.el)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::invalid(key, "must be a positive number of amps"));
            }
        }

        Ok(())
    }
}
