//! Threshold resolution.
//!
//! Resolution order, lowest to highest precedence:
//! 1. Profile defaults
//! 2. Override layer (environment, with CLI flags layered on top by the caller)
//! 3. Explicit per-provider override map
//!
//! Scoped thresholds inherit when unset: pipeline values fall back to the
//! global ones, and frontend values fall back to the pipeline ones.

use crate::overrides::{parse_provider_overrides, ThresholdOverrides};
use crate::profile::{GateMode, Profile};
use crate::thresholds::{AbsoluteThresholds, ScopeThresholds, ThresholdSet};
use serde::{Deserialize, Serialize};
use tg_common::event_names;

/// Resolve the regression threshold set for a profile.
///
/// `provider_override_map` is raw JSON; its entries are layered over any
/// provider map carried in `overrides`.
pub fn resolve(
    profile: Profile,
    overrides: &ThresholdOverrides,
    provider_override_map: Option<&str>,
) -> ThresholdSet {
    let d = profile.defaults();

    let max_success_drop = overrides.max_success_drop.unwrap_or(d.max_success_drop);
    let max_p95_increase_ms = overrides
        .max_p95_increase_ms
        .unwrap_or(d.max_p95_increase_ms);
    let max_provider_failrate_increase = overrides
        .max_provider_failrate_increase
        .unwrap_or(d.max_provider_failrate_increase);

    let pipeline = ScopeThresholds {
        max_success_drop: overrides
            .pipeline
            .max_success_drop
            .unwrap_or(max_success_drop),
        max_p95_increase_ms: overrides
            .pipeline
            .max_p95_increase_ms
            .unwrap_or(max_p95_increase_ms),
        max_failrate_increase: overrides
            .pipeline
            .max_failrate_increase
            .unwrap_or(max_provider_failrate_increase),
    };
    let frontend = ScopeThresholds {
        max_success_drop: overrides
            .frontend
            .max_success_drop
            .unwrap_or(pipeline.max_success_drop),
        max_p95_increase_ms: overrides
            .frontend
            .max_p95_increase_ms
            .unwrap_or(pipeline.max_p95_increase_ms),
        max_failrate_increase: overrides
            .frontend
            .max_failrate_increase
            .unwrap_or(pipeline.max_failrate_increase),
    };

    let mut provider_overrides = overrides
        .provider_thresholds_json
        .as_deref()
        .map(parse_provider_overrides)
        .unwrap_or_default();
    if let Some(raw) = provider_override_map {
        provider_overrides.extend(parse_provider_overrides(raw));
    }

    ThresholdSet {
        max_success_drop,
        max_p95_increase_ms,
        max_provider_failrate_increase,
        pipeline,
        frontend,
        min_pipeline_samples: overrides
            .min_pipeline_samples
            .unwrap_or(d.min_pipeline_samples),
        provider_overrides,
    }
}

/// Resolve the quality-gate thresholds for a profile.
pub fn resolve_absolute(profile: Profile, overrides: &ThresholdOverrides) -> AbsoluteThresholds {
    let d = profile.defaults().absolute;
    AbsoluteThresholds {
        min_success_rate: overrides.min_success_rate.unwrap_or(d.min_success_rate),
        min_provider_success_rate: overrides
            .min_provider_success_rate
            .unwrap_or(d.min_provider_success_rate),
        max_p95_ms: overrides.max_p95_ms.unwrap_or(d.max_p95_ms),
        require_provider_events: overrides
            .require_provider_events
            .unwrap_or(d.require_provider_events),
    }
}

/// Everything a gate invocation needs, resolved once and then read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub profile: Profile,
    pub mode: GateMode,
    pub window_size: usize,
    pub thresholds: ThresholdSet,
    pub absolute: AbsoluteThresholds,
}

impl GateConfig {
    /// Resolve a full gate configuration from an override layer.
    ///
    /// An unset profile means `ci`; an unknown one means the strictest.
    /// An unknown mode means `block`.
    pub fn resolve(overrides: &ThresholdOverrides, provider_override_map: Option<&str>) -> Self {
        let profile = overrides
            .profile
            .as_deref()
            .map(Profile::parse_or_strictest)
            .unwrap_or_default();
        let defaults = profile.defaults();
        let mode = overrides
            .mode
            .as_deref()
            .map(GateMode::parse_or_block)
            .unwrap_or(defaults.mode);

        let config = GateConfig {
            profile,
            mode,
            window_size: overrides.window_size.unwrap_or(defaults.window_size),
            thresholds: resolve(profile, overrides, provider_override_map),
            absolute: resolve_absolute(profile, overrides),
        };
        tracing::debug!(
            target: event_names::CONFIG_RESOLVED,
            profile = %config.profile,
            mode = %config.mode,
            window_size = config.window_size,
            providers_overridden = config.thresholds.provider_overrides.len(),
            "gate configuration resolved"
        );
        config
    }

    /// Profile defaults with no overrides applied.
    pub fn for_profile(profile: Profile) -> Self {
        let overrides = ThresholdOverrides {
            profile: Some(profile.as_str().to_string()),
            ..Default::default()
        };
        Self::resolve(&overrides, None)
    }
}
