//! Exit codes and structured error output.

use serde::Serialize;

use crate::source::SourceError;
use crate::sync::SyncError;

/// Process exit codes.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 3: Partial success (some assets could not be read or fingerprinted)
/// - 4: Source unavailable (library root missing or unreadable)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The command completed normally.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Completed, but some assets failed and will be retried next pass.
    PartialSuccess = 3,
    /// The asset source could not be read.
    SourceUnavailable = 4,
    /// Interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "SS000",
            Self::GeneralError => "SS001",
            Self::PartialSuccess => "SS003",
            Self::SourceUnavailable => "SS004",
            Self::Interrupted => "SS130",
        }
    }

    /// Map an application error to its exit code.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(sync) = err.downcast_ref::<SyncError>() {
            return match sync {
                SyncError::Interrupted => Self::Interrupted,
                SyncError::SourceUnavailable(_) => Self::SourceUnavailable,
                SyncError::Persistence(_) => Self::GeneralError,
            };
        }
        match err.downcast_ref::<SourceError>() {
            Some(e) if e.is_fatal() => Self::SourceUnavailable,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "SS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
