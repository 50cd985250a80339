//! Exit codes and machine-readable error reports.

use serde::Serialize;

use crate::signal::EXIT_CODE_INTERRUPTED;

/// Process exit codes.
///
/// - 0: the run completed, even if some files could not be read or stored
/// - 1: a fatal error stopped the run (bad root, unusable database, bad config)
/// - 130: interrupted by Ctrl+C; entries collected so far were still persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run completed.
    Success = 0,
    /// A fatal error stopped the run.
    GeneralError = 1,
    /// Interrupted by the user.
    Interrupted = EXIT_CODE_INTERRUPTED as isize,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "S3000",
            Self::GeneralError => "S3001",
            Self::Interrupted => "S3130",
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix (e.g. "S3001")
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Human-readable message, including the cause chain
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Build a report from an application error and its exit code.
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
