//! Trend gate configuration.
//!
//! This crate provides:
//! - Built-in threshold profiles (`ci`, `nightly`, `release`)
//! - Environment-style key/value overrides
//! - Resolution into one immutable threshold set per gate invocation
//! - Semantic validation of the resolved set

pub mod overrides;
pub mod profile;
pub mod resolve;
pub mod thresholds;
pub mod validate;

pub use overrides::{parse_provider_overrides, ScopeOverrides, ThresholdOverrides};
pub use profile::{GateMode, Profile, ProfileDefaults};
pub use resolve::{resolve, resolve_absolute, GateConfig};
pub use thresholds::{AbsoluteThresholds, ScopeThresholds, ThresholdSet};
pub use validate::{
    validate_config, validate_window_size, ValidationError, ValidationResult,
};

/// Default number of events per window when neither CLI nor environment set one.
pub const DEFAULT_WINDOW_SIZE: usize = 200;
