//! Structured event names and correlation context for logging.

use serde::{Deserialize, Serialize};

/// Log levels as written in JSONL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Processing stages of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration resolution.
    Init,
    /// Reading the event log or stored documents.
    Read,
    /// Window summaries and trend snapshots.
    Summarize,
    /// Regression and quality gates.
    Gate,
    /// Baseline history update and threshold suggestion.
    Tune,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Read => "read",
            Stage::Summarize => "summarize",
            Stage::Gate => "gate",
            Stage::Tune => "tune",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub use tg_common::event_names;

/// Correlation context shared by every log line of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// CLI command being run (`gate`, `check`, ...).
    pub command: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, command: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            command: command.into(),
        }
    }

    /// A span carrying the context; the JSONL layer copies its fields onto
    /// every event emitted inside it. The stage is per event, see `log_event!`.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("tg", run_id = %self.run_id, command = %self.command)
    }
}
