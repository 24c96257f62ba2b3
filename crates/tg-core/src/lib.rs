//! Trend Gate Core Library
//!
//! This library provides the core functionality for telemetry trend gating:
//! - Window summaries over the event log
//! - Trend snapshots comparing the current and previous windows
//! - Regression and absolute threshold gates
//! - Baseline tuning from accumulated window history
//! - Exit codes and structured logging for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod gate;
pub mod logging;
pub mod summarize;
pub mod trend;
pub mod tuner;

pub use exit_codes::ExitCode;
pub use gate::{
    absolute_gate, evaluate_absolute, evaluate_regression, regression_gate, AbsoluteGateReport,
    Decision, RegressionGateReport,
};
pub use summarize::summarize;
pub use trend::{build, build_at, compute_delta, split_windows};
pub use tuner::{derive_baseline, update, Baseline, SuggestedThresholds};
