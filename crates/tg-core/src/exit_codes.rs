//! Exit codes for the tg-core CLI.
//!
//! Exit codes communicate the gate outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-1: Gate outcomes (only a blocking FAIL is non-zero)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for tg-core operations.
///
/// These codes are a stable contract for CI automation. A tooling error is
/// never reported as `GateFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Gate Outcomes (0-1)
    // ========================================================================
    /// PASS, WARN, SKIPPED_NO_BASELINE, or a non-gating command succeeded
    Clean = 0,

    /// FAIL decision in block mode
    GateFailed = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Unreadable log, unparseable history or trend snapshot
    InputError = 11,

    /// Resolved configuration failed validation
    ConfigError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// Failure writing output files
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code lets the calling pipeline continue.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Check if this exit code is a gate outcome rather than a tooling error.
    pub fn is_gate_outcome(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        let code = self as i32;
        (10..20).contains(&code)
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Check if this exit code indicates a tooling error.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::GateFailed => "GATE_FAILED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&tg_common::Error> for ExitCode {
    fn from(err: &tg_common::Error) -> Self {
        use tg_common::ErrorCategory;
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Input => ExitCode::InputError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Internal => ExitCode::InternalError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
