//! # DishKit
//!
//! Control front-end for a two-axis (azimuth/elevation) antenna rotor
//! connected over a serial line.
//!
//! ## Architecture
//!
//! DishKit is organized as a workspace with multiple crates:
//!
//! 1. **dishkit-core** - Axis and motor types, connection status, errors, events
//! 2. **dishkit-communication** - Line protocol, serial transport, worker thread, controller
//! 3. **dishkit-settings** - Configuration file handling
//! 4. **dishkit** - Console binary that integrates all crates

pub mod console;

pub use dishkit_communication::{
    decode, list_ports, Command, DishController, Message, SerialOpener, SerialPortInfo,
    TransportOpener,
};

pub use dishkit_core::{
    Axis, ConnectionError, ConnectionState, ConnectionStatus, DishEvent, DishListener,
    DishListenerHandle, Error, EventDispatcher, MotorState, MotorStatus, OvercurrentLimits,
    ProtocolError, Result, StopReason, UsageError,
};

pub use dishkit_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Pretty formatted output on stderr, leaving stdout to the console
/// - RUST_LOG environment variable support, INFO when unset
/// - Thread names, so the `dish-serial` worker is easy to spot
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
