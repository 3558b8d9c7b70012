//! DishKit Settings Crate
//!
//! Handles the console's configuration file: serial link parameters,
//! overcurrent limits and console preferences.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, ConsoleSettings, LimitSettings};
pub use error::{SettingsError, SettingsResult};
