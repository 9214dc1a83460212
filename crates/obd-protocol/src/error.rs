//! OBD-II Error Types

use crate::pid::Pid;
use thiserror::Error;

/// Errors that can occur while talking to an ELM327 adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObdError {
    /// No send possible right now (e.g. write channel not discovered yet)
    #[error("Transport unavailable")]
    TransportUnavailable,

    /// Transport went away for good
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// A command is still awaiting its `>` prompt
    #[error("Command {0:?} still awaiting a response")]
    CommandInFlight(String),

    /// Response did not match the fixed frame layout for the PID
    #[error("Response {response:?} does not match the {pid:?} frame layout")]
    DecodeMismatch { pid: Pid, response: String },

    /// `start` called on a session that is not idle
    #[error("Session already started")]
    AlreadyStarted,

    /// Operation requires a running session
    #[error("Session not started")]
    NotStarted,

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(String),
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::Serial(err.to_string())
    }
}

impl From<tokio_serial::Error> for ObdError {
    fn from(err: tokio_serial::Error) -> Self {
        ObdError::Serial(err.to_string())
    }
}
