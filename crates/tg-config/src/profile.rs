//! Built-in threshold profiles.
//!
//! Provides pre-built defaults for:
//! - CI: deterministic mocked dependencies, perfection required, blocking
//! - Nightly: live external dependencies, widest tolerances, warn only
//! - Release: mocked dependencies, tightest tolerances, blocking

use crate::thresholds::AbsoluteThresholds;
use crate::DEFAULT_WINDOW_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use tg_common::event_names;

/// Available threshold profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Pull-request and merge CI against mocked providers
    #[default]
    Ci,
    /// Scheduled runs against live providers
    Nightly,
    /// Release candidate validation against mocked providers
    Release,
}

impl Profile {
    /// All available profiles.
    pub const ALL: &'static [Profile] = &[Profile::Ci, Profile::Nightly, Profile::Release];

    /// The profile with the tightest tolerances; used for unknown names.
    pub const STRICTEST: Profile = Profile::Release;

    /// Get profile name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Ci => "ci",
            Profile::Nightly => "nightly",
            Profile::Release => "release",
        }
    }

    /// Parse profile name from string.
    pub fn parse(s: &str) -> Option<Profile> {
        match s.trim().to_lowercase().as_str() {
            "ci" => Some(Profile::Ci),
            "nightly" => Some(Profile::Nightly),
            "release" => Some(Profile::Release),
            _ => None,
        }
    }

    /// Parse a profile name, falling back to the strictest profile.
    pub fn parse_or_strictest(s: &str) -> Profile {
        Profile::parse(s).unwrap_or_else(|| {
            tracing::warn!(
                target: event_names::CONFIG_OVERRIDE_IGNORED,
                profile = s,
                fallback = Profile::STRICTEST.as_str(),
                "unknown profile, using strictest"
            );
            Profile::STRICTEST
        })
    }

    /// Get a description of the profile.
    pub fn description(&self) -> &'static str {
        match self {
            Profile::Ci => "Mocked providers; 100% success required, tight p95, blocking",
            Profile::Nightly => {
                "Live providers; lower success floor, higher p95 ceiling, wider regression tolerance, warn only"
            }
            Profile::Release => "Mocked providers; tightest tolerances of all profiles, blocking",
        }
    }

    /// Default values for this profile.
    pub fn defaults(&self) -> ProfileDefaults {
        match self {
            Profile::Ci => ci_defaults(),
            Profile::Nightly => nightly_defaults(),
            Profile::Release => release_defaults(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::parse(s).ok_or_else(|| crate::ValidationError::UnknownProfile(s.to_string()))
    }
}

/// How a violated gate is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Violations produce `WARN`; the process always exits 0.
    Warn,
    /// Violations produce `FAIL`; the process exits non-zero.
    Block,
}

impl GateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateMode::Warn => "warn",
            GateMode::Block => "block",
        }
    }

    pub fn parse(s: &str) -> Option<GateMode> {
        match s.trim().to_lowercase().as_str() {
            "warn" | "warning" => Some(GateMode::Warn),
            "block" | "fail" | "enforce" => Some(GateMode::Block),
            _ => None,
        }
    }

    /// Parse a mode, failing closed to `Block` for unknown values.
    pub fn parse_or_block(s: &str) -> GateMode {
        GateMode::parse(s).unwrap_or_else(|| {
            tracing::warn!(
                target: event_names::CONFIG_OVERRIDE_IGNORED,
                mode = s,
                "unknown gate mode, using block"
            );
            GateMode::Block
        })
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GateMode {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateMode::parse(s).ok_or_else(|| crate::ValidationError::InvalidValue {
            field: "mode".to_string(),
            message: format!("expected warn or block, got '{}'", s),
        })
    }
}

/// Defaults a profile contributes before any override is applied.
///
/// Pipeline- and frontend-scoped thresholds are deliberately absent: unless
/// overridden they inherit from the global regression thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefaults {
    pub mode: GateMode,
    pub window_size: usize,
    pub max_success_drop: f64,
    pub max_p95_increase_ms: f64,
    pub max_provider_failrate_increase: f64,
    pub min_pipeline_samples: u64,
    pub absolute: AbsoluteThresholds,
}

/// CI profile: mocked providers, so any failure is a real regression.
fn ci_defaults() -> ProfileDefaults {
    ProfileDefaults {
        mode: GateMode::Block,
        window_size: DEFAULT_WINDOW_SIZE,
        max_success_drop: 0.01,
        max_p95_increase_ms: 2_000.0,
        max_provider_failrate_increase: 0.02,
        min_pipeline_samples: 5,
        absolute: AbsoluteThresholds {
            min_success_rate: 1.0,
            min_provider_success_rate: 1.0,
            max_p95_ms: 5_000.0,
            require_provider_events: false,
        },
    }
}

/// Nightly profile: live providers with real latency and flakiness.
fn nightly_defaults() -> ProfileDefaults {
    ProfileDefaults {
        mode: GateMode::Warn,
        window_size: DEFAULT_WINDOW_SIZE,
        max_success_drop: 0.05,
        max_p95_increase_ms: 10_000.0,
        max_provider_failrate_increase: 0.10,
        min_pipeline_samples: 10,
        absolute: AbsoluteThresholds {
            min_success_rate: 0.90,
            min_provider_success_rate: 0.85,
            max_p95_ms: 30_000.0,
            require_provider_events: true,
        },
    }
}

/// Release profile: mocked providers, tightest tolerances.
fn release_defaults() -> ProfileDefaults {
    ProfileDefaults {
        mode: GateMode::Block,
        window_size: DEFAULT_WINDOW_SIZE,
        max_success_drop: 0.005,
        max_p95_increase_ms: 1_000.0,
        max_provider_failrate_increase: 0.01,
        min_pipeline_samples: 5,
        absolute: AbsoluteThresholds {
            min_success_rate: 1.0,
            min_provider_success_rate: 1.0,
            max_p95_ms: 3_000.0,
            require_provider_events: true,
        },
    }
}
