//! Logging setup
//!
//! Installs the global `tracing` subscriber, plain text or JSON lines, at the
//! level named in the `[logging]` section.

use crate::config::{LogFormat, LoggingConfig};
use crate::DriveError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), DriveError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| DriveError::Logging(format!("unknown log level: {}", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = match config.format {
        LogFormat::Plain => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    result.map_err(|e| DriveError::Logging(e.to_string()))
}
