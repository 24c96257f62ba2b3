//! Trend gate telemetry storage.
//!
//! This crate owns every file the gate reads or writes:
//! - The append-only, newline-delimited event log (read only)
//! - Trend snapshot documents
//! - The baseline history document (atomic read-modify-write)
//!
//! It also defines the persisted metric types so that the documents have a
//! single schema regardless of which command produced them.

pub mod history;
pub mod persist;
pub mod reader;
pub mod snapshot;

pub use history::{load_history, save_history, BaselineHistory, HistoryEntry};
pub use persist::{read_json, write_json_atomic};
pub use reader::{read_events, read_events_from, read_log, EventLog};
pub use snapshot::{
    read_snapshot, write_snapshot, PipelineMetrics, TrendDelta, TrendSnapshot,
    WindowMetricsSummary,
};
