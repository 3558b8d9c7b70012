//! Error types for the settings crate.

use std::io;
use thiserror::Error;

/// Errors that can occur while loading, validating or saving a config file.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("Cannot read {path}: {source}")]
    Read {
        /// File that was being read.
        path: String,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// The file or its parent directory could not be written.
    #[error("Cannot write {path}: {source}")]
    Write {
        /// File or directory that was being written.
        path: String,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// A value failed validation.
    #[error("Invalid value for '{key}': {reason}")]
    Invalid {
        /// Dotted path of the offending key, e.g. `limits.az`.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The file extension is neither `.toml` nor `.json`.
    #[error("Config files must be .toml or .json, got '{0}'")]
    UnsupportedFormat(String),

    /// The platform has no per-user configuration directory.
    #[error("No configuration directory on this platform")]
    NoConfigDir,

    #[error("Malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Cannot encode TOML config: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl SettingsError {
    /// Build a [`SettingsError::Invalid`]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages() {
        let err = SettingsError::invalid("connection.baud_rate", "must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'connection.baud_rate': must be > 0"
        );

        let err = SettingsError::UnsupportedFormat("yaml".to_string());
        assert_eq!(
            err.to_string(),
            "Config files must be .toml or .json, got 'yaml'"
        );
    }

    #[test]
    fn test_read_keeps_source() {
        let err = SettingsError::Read {
            path: "/etc/dishkit.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Cannot read /etc/dishkit.toml: denied");
        assert!(err.source().is_some());
    }
}
