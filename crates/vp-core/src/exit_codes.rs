//! Exit codes for the vp-core CLI.
//!
//! Exit code ranges:
//! - 0-9: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use vp_common::{Error, ErrorCategory};

/// Exit codes for vp-core operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// The engine refused the request (duplicate evidence, bad index,
    /// invalid prior, zero marginal, ...). Nothing changed.
    Rejected = 4,

    /// Invalid arguments or configuration
    ArgsError = 10,

    /// Caller is not the owner
    PermissionError = 12,

    /// Configuration schema version mismatch
    VersionError = 13,

    /// Deployment has no owner yet, or already has one
    NotInitialized = 15,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O, store or audit sink failure
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 0-9 describe outcomes, not failures of the tool.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Stable name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::Rejected => "ERR_REJECTED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::PermissionError => "ERR_PERMISSION",
            ExitCode::VersionError => "ERR_VERSION",
            ExitCode::NotInitialized => "ERR_NOT_INITIALIZED",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Exit code for an engine error.
    pub fn for_error(err: &Error) -> ExitCode {
        match err {
            Error::Unauthorized { .. } => ExitCode::PermissionError,
            Error::NotInitialized | Error::AlreadyInitialized { .. } => ExitCode::NotInitialized,
            Error::DivisionByZero(_) => ExitCode::InternalError,
            Error::ScaleMismatch { .. } => ExitCode::VersionError,
            _ => match err.category() {
                ErrorCategory::Config => ExitCode::ArgsError,
                ErrorCategory::Evidence | ErrorCategory::Model => ExitCode::Rejected,
                ErrorCategory::Storage | ErrorCategory::Io => ExitCode::IoError,
                ErrorCategory::Authorization => ExitCode::PermissionError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
