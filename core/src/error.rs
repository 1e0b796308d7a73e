//! Error types for the portpilot-core library.

use thiserror::Error;

/// Result type alias for portpilot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure, used when composing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad input caught locally before any backend call.
    Validation,
    /// The backend call itself could not complete.
    Transport,
    /// The backend completed but reported an application-level error.
    Remote,
}

/// Errors that can occur while listing ports, terminating processes
/// or persisting settings.
#[derive(Error, Debug)]
pub enum Error {
    /// A PID supplied by the caller is not a positive integer.
    #[error("Invalid PID: {0}. PID must be a positive integer.")]
    InvalidPid(String),

    /// A termination for this PID is already in flight.
    #[error("Process {0} is already being terminated")]
    KillInProgress(u32),

    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Permission denied for an operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The target process does not exist.
    #[error("Process with PID {0} not found")]
    ProcessNotFound(u32),

    /// The backend tried and failed to terminate a process.
    #[error("Could not terminate process {pid}: {reason}")]
    TerminationFailed { pid: u32, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::InvalidPid(_) | Error::KillInProgress(_) | Error::Config(_) => {
                FailureKind::Validation
            }
            Error::CommandFailed(_)
            | Error::ParseError(_)
            | Error::Unavailable(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::UnsupportedPlatform(_) => FailureKind::Transport,
            Error::PermissionDenied(_)
            | Error::ProcessNotFound(_)
            | Error::TerminationFailed { .. } => FailureKind::Remote,
        }
    }
}
