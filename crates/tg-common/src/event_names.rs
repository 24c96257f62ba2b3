//! Structured event names shared by every tg-* crate.
//!
//! Each name is used as the tracing `target` and lands in the `event`
//! field of JSONL log lines.

// Run lifecycle
pub const RUN_STARTED: &str = "run.started";
pub const RUN_FINISHED: &str = "run.finished";

// Read stage
pub const LOG_READ: &str = "log.read";
pub const LOG_LINES_DROPPED: &str = "log.lines_dropped";
pub const READ_FINISHED: &str = "read.finished";

// Summarize stage
pub const SUMMARIZE_WINDOW: &str = "summarize.window";
pub const SNAPSHOT_BUILT: &str = "summarize.snapshot_built";

// Gate stage
pub const GATE_PIPELINE_SKIPPED: &str = "gate.pipeline_skipped";
pub const GATE_VIOLATION: &str = "gate.violation";
pub const GATE_DECISION: &str = "gate.decision";

// Tune stage
pub const TUNE_UPDATED: &str = "tune.updated";

// Stored documents
pub const STORE_WRITTEN: &str = "store.written";
pub const STORE_HISTORY_MISSING: &str = "store.history_missing";
pub const STORE_ENTRIES_DROPPED: &str = "store.entries_dropped";

// Config events
pub const CONFIG_RESOLVED: &str = "config.resolved";
pub const CONFIG_INVALID: &str = "config.invalid";
pub const CONFIG_OVERRIDE_IGNORED: &str = "config.override_ignored";

// Error events
pub const TOOLING_ERROR: &str = "tooling_error";
