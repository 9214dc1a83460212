//! OBD Buddy Drive Pipeline
//!
//! Wires one adapter session to one braking detector for the length of a
//! drive, plus the process-level plumbing: configuration and logging.

pub mod config;
mod drive;
mod logging;

pub use config::{DriveConfig, LogFormat, LoggingConfig};
pub use drive::{Clock, Drive};
pub use logging::init_logging;

use braking::BrakingError;
use obd_protocol::ObdError;
use thiserror::Error;

/// Drive error types
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Adapter error: {0}")]
    Obd(#[from] ObdError),

    #[error("Braking error: {0}")]
    Braking(#[from] BrakingError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
