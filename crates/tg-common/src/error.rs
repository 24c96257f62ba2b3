//! Error types for trend gating.
//!
//! These are tooling errors: an unreadable log, a corrupt history file, an
//! invalid configuration. Gate outcomes (`WARN`, `FAIL`,
//! `SKIPPED_NO_BASELINE`) are never errors and never pass through here.
//!
//! Errors serialize to structured JSON for automation:
//! ```json
//! {
//!   "code": 21,
//!   "category": "input",
//!   "message": "history file corrupted: history.json: expected value at line 1",
//!   "remediation": "Restore the history file from a previous CI artifact or delete it to start a fresh baseline.",
//!   "context": { "path": "history.json" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trend gate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Threshold or profile configuration errors.
    Config,
    /// Unreadable or unparseable input documents.
    Input,
    /// Output write failures.
    Io,
    /// Bugs.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Unified error type for trend gating.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    // Input errors (20-29)
    #[error("event log unreadable: {}: {source}", path.display())]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file corrupted: {}: {reason}", path.display())]
    HistoryCorrupted { path: PathBuf, reason: String },

    #[error("trend snapshot unreadable: {}: {reason}", path.display())]
    SnapshotCorrupted { path: PathBuf, reason: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal (90)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 60-69: I/O errors
    /// - 90: Internal errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidThresholds(_) => 11,
            Error::LogUnreadable { .. } => 20,
            Error::HistoryCorrupted { .. } => 21,
            Error::SnapshotCorrupted { .. } => 22,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Internal(_) => 90,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidThresholds(_) => ErrorCategory::Config,
            Error::LogUnreadable { .. }
            | Error::HistoryCorrupted { .. }
            | Error::SnapshotCorrupted { .. } => ErrorCategory::Input,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check TREND_* and QUALITY_* environment variables and CLI flags."
            }
            Error::InvalidThresholds(_) => {
                "Rates must be within [0, 1] and millisecond values finite and non-negative."
            }
            Error::LogUnreadable { .. } => {
                "Verify the event log path exists and is readable by this process."
            }
            Error::HistoryCorrupted { .. } => {
                "Restore the history file from a previous CI artifact or delete it to start a fresh baseline."
            }
            Error::SnapshotCorrupted { .. } => {
                "Regenerate the trend snapshot with 'tg-core snapshot --log <path> --out <file>'."
            }
            Error::Io(_) => "Check disk space and permissions on the output directory.",
            Error::Json(_) => "Internal serialization failure. Report with the command line used.",
            Error::Internal(_) => "This is a bug. Report with the command line and input files.",
        }
    }

    /// The file path an error concerns, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::LogUnreadable { path, .. }
            | Error::HistoryCorrupted { path, .. }
            | Error::SnapshotCorrupted { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Remediation hint.
    pub remediation: String,

    /// Additional structured context (e.g., file path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();
        if let Some(path) = err.path() {
            context.insert(
                "path".to_string(),
                serde_json::json!(path.display().to_string()),
            );
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            remediation: err.remediation().to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        let cases: Vec<(Error, u32, ErrorCategory)> = vec![
            (Error::Config("x".into()), 10, ErrorCategory::Config),
            (Error::InvalidThresholds("x".into()), 11, ErrorCategory::Config),
            (
                Error::HistoryCorrupted {
                    path: "h.json".into(),
                    reason: "eof".into(),
                },
                21,
                ErrorCategory::Input,
            ),
            (Error::Internal("x".into()), 90, ErrorCategory::Internal),
        ];
        for (err, code, category) in cases {
            assert_eq!(err.code(), code, "{err}");
            assert_eq!(err.category(), category, "{err}");
        }
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert_eq!(err.code(), 60);
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn log_unreadable_message_includes_path() {
        let err = Error::LogUnreadable {
            path: "/tmp/missing.jsonl".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing.jsonl"));
        assert_eq!(err.path().unwrap().to_str(), Some("/tmp/missing.jsonl"));
    }

    #[test]
    fn structured_error_carries_path_context() {
        let err = Error::SnapshotCorrupted {
            path: "trend.json".into(),
            reason: "missing field `current`".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 22);
        assert_eq!(structured.category, ErrorCategory::Input);
        assert_eq!(structured.context["path"], "trend.json");

        let json: serde_json::Value = serde_json::from_str(&structured.to_json()).unwrap();
        assert_eq!(json["category"], "input");
    }

    #[test]
    fn structured_error_with_context() {
        let structured =
            StructuredError::from(&Error::Config("bad".into())).with_context("key", "TREND_X");
        assert_eq!(structured.context["key"], "TREND_X");
        assert!(structured.to_json_pretty().contains('\n'));
    }
}
