//! Resolved threshold sets.
//!
//! A [`ThresholdSet`] is produced once per gate invocation and never mutated
//! afterwards. All tolerances are "maximum allowed degradation": a check fails
//! only when the observed degradation is strictly greater than the tolerance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tg_common::is_frontend_pipeline;

/// Regression tolerances applied to one pipeline scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScopeThresholds {
    /// Maximum allowed success-rate drop (rate units).
    pub max_success_drop: f64,
    /// Maximum allowed p95 increase in milliseconds.
    pub max_p95_increase_ms: f64,
    /// Maximum allowed fail-rate increase (rate units).
    pub max_failrate_increase: f64,
}

/// Regression thresholds for the window-over-window gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub max_success_drop: f64,
    pub max_p95_increase_ms: f64,
    pub max_provider_failrate_increase: f64,
    /// Thresholds for non-frontend pipelines.
    pub pipeline: ScopeThresholds,
    /// Thresholds for pipelines whose name starts with `frontend.`.
    pub frontend: ScopeThresholds,
    /// Pipelines with fewer attempts than this in either window are skipped.
    pub min_pipeline_samples: u64,
    /// Per-provider fail-rate tolerances; providers not listed use the global one.
    #[serde(default)]
    pub provider_overrides: BTreeMap<String, f64>,
}

impl ThresholdSet {
    /// Scope thresholds that apply to the named pipeline.
    pub fn scope_for(&self, pipeline: &str) -> &ScopeThresholds {
        if is_frontend_pipeline(pipeline) {
            &self.frontend
        } else {
            &self.pipeline
        }
    }

    /// Fail-rate tolerance for the named provider.
    pub fn provider_failrate_threshold(&self, provider: &str) -> f64 {
        self.provider_overrides
            .get(provider)
            .copied()
            .unwrap_or(self.max_provider_failrate_increase)
    }
}

/// Thresholds for the single-window quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteThresholds {
    /// Minimum overall success rate.
    pub min_success_rate: f64,
    /// Minimum success rate of each provider with attempts.
    pub min_provider_success_rate: f64,
    /// Maximum overall p95 latency in milliseconds.
    pub max_p95_ms: f64,
    /// Fail when the window carries no provider-tagged events.
    pub require_provider_events: bool,
}
