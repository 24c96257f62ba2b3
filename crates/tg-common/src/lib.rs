//! Trend gate common types, decoding helpers, and errors.
//!
//! This crate provides foundational types shared across the tg-* crates:
//! - The event record model written by upstream pipelines
//! - A closed metadata value type for the open metadata bag
//! - The silent-degrade decoding helper used by every reader
//! - Common error types with stable codes
//! - Output format specifications

pub mod error;
pub mod event;
pub mod event_names;
pub mod output;
pub mod parse;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use event::{is_frontend_pipeline, EventRecord, EventStatus, MetadataValue, FRONTEND_PREFIX};
pub use output::OutputFormat;
pub use parse::{parse_or_default, parse_value_or_default};

/// Schema version stamped on every persisted document (snapshots, history, baselines).
pub const SCHEMA_VERSION: &str = "1.0.0";
