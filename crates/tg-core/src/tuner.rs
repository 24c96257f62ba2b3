//! Baseline tuner.
//!
//! Appends each snapshot's current window to the history, measures the
//! degradation across every consecutive pair of entries, and suggests
//! thresholds at the 95th percentile of those degradations. Improvements
//! clamp to zero, so only degradations shape the suggestion.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tg_common::{event_names, SCHEMA_VERSION};
use tg_config::overrides::{
    ENV_MAX_P95_INCREASE_MS, ENV_MAX_PROVIDER_FAILRATE_INCREASE, ENV_MAX_SUCCESS_DROP,
    ENV_PROVIDER_THRESHOLDS_JSON,
};
use tg_math::{degradation_decrease, degradation_increase, percentile, P95};
use tg_telemetry::{BaselineHistory, HistoryEntry, TrendSnapshot};

/// Transitions required before suggestions are worth acting on.
pub const MIN_TRANSITIONS_FOR_TUNING: usize = 5;

/// Suggestions never go below these, however clean the history.
pub const SUCCESS_DROP_FLOOR: f64 = 0.01;
pub const P95_INCREASE_FLOOR_MS: f64 = 5_000.0;
pub const PROVIDER_FAILRATE_FLOOR: f64 = 0.02;

/// Thresholds derived from observed degradations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedThresholds {
    pub max_success_drop: f64,
    pub max_p95_increase_ms: f64,
    pub max_provider_failrate_increase: f64,
    /// Per-provider fail-rate tolerances, never below the global one.
    pub provider_overrides: BTreeMap<String, f64>,
}

impl SuggestedThresholds {
    /// Render as environment overrides understood by the resolver.
    pub fn to_env_overrides(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(ENV_MAX_SUCCESS_DROP.to_string(), self.max_success_drop.to_string());
        env.insert(
            ENV_MAX_P95_INCREASE_MS.to_string(),
            self.max_p95_increase_ms.to_string(),
        );
        env.insert(
            ENV_MAX_PROVIDER_FAILRATE_INCREASE.to_string(),
            self.max_provider_failrate_increase.to_string(),
        );
        if !self.provider_overrides.is_empty() {
            let json = serde_json::to_string(&self.provider_overrides).unwrap_or_default();
            env.insert(ENV_PROVIDER_THRESHOLDS_JSON.to_string(), json);
        }
        env
    }
}

/// Worst degradations seen, for comparing suggestions against the extreme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedMaxima {
    pub success_drop: f64,
    pub p95_increase_ms: f64,
    pub provider_failrate_increase: f64,
}

/// The derived baseline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub sample_count: usize,
    pub transition_count: usize,
    /// Below [`MIN_TRANSITIONS_FOR_TUNING`] suggestions are advisory only.
    pub ready_for_tuning: bool,
    pub suggested_thresholds: SuggestedThresholds,
    pub observed_max: ObservedMaxima,
}

/// Per-transition degradation series.
#[derive(Debug, Default)]
struct DegradationSeries {
    success_drop: Vec<f64>,
    p95_increase: Vec<f64>,
    provider_all: Vec<f64>,
    provider: BTreeMap<String, Vec<f64>>,
}

impl DegradationSeries {
    fn collect(history: &BaselineHistory) -> Self {
        let mut series = DegradationSeries::default();
        for (earlier, later) in history.transitions() {
            series
                .success_drop
                .push(degradation_decrease(earlier.success_rate, later.success_rate));
            series
                .p95_increase
                .push(degradation_increase(earlier.p95_ms, later.p95_ms));

            for (provider, later_rate) in &later.provider_fail_rate {
                let Some(earlier_rate) = earlier.provider_fail_rate.get(provider) else {
                    continue;
                };
                let increase = degradation_increase(*earlier_rate, *later_rate);
                series.provider_all.push(increase);
                series
                    .provider
                    .entry(provider.clone())
                    .or_default()
                    .push(increase);
            }
        }
        series
    }
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Derive a baseline from a complete history.
pub fn derive_baseline(history: &BaselineHistory, generated_at: DateTime<Utc>) -> Baseline {
    let series = DegradationSeries::collect(history);

    let max_success_drop = percentile(&series.success_drop, P95).max(SUCCESS_DROP_FLOOR);
    let max_p95_increase_ms = percentile(&series.p95_increase, P95).max(P95_INCREASE_FLOOR_MS);
    let max_provider_failrate_increase =
        percentile(&series.provider_all, P95).max(PROVIDER_FAILRATE_FLOOR);
    let provider_overrides = series
        .provider
        .iter()
        .map(|(name, values)| {
            (
                name.clone(),
                percentile(values, P95).max(max_provider_failrate_increase),
            )
        })
        .collect();

    let transition_count = history.transition_count();
    Baseline {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at,
        sample_count: history.len(),
        transition_count,
        ready_for_tuning: transition_count >= MIN_TRANSITIONS_FOR_TUNING,
        suggested_thresholds: SuggestedThresholds {
            max_success_drop,
            max_p95_increase_ms,
            max_provider_failrate_increase,
            provider_overrides,
        },
        observed_max: ObservedMaxima {
            success_drop: max_of(&series.success_drop),
            p95_increase_ms: max_of(&series.p95_increase),
            provider_failrate_increase: max_of(&series.provider_all),
        },
    }
}

/// Record a snapshot in the history and derive the new baseline.
pub fn update(snapshot: &TrendSnapshot, mut history: BaselineHistory) -> (BaselineHistory, Baseline) {
    history.upsert(HistoryEntry::from_snapshot(snapshot));
    let baseline = derive_baseline(&history, snapshot.generated_at);
    tracing::info!(
        target: event_names::TUNE_UPDATED,
        samples = baseline.sample_count,
        transitions = baseline.transition_count,
        ready = baseline.ready_for_tuning,
        "baseline updated"
    );
    (history, baseline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        format!("2026-04-{:02}T06:00:00Z", day).parse().unwrap()
    }

    fn entry(day: u32, success_rate: f64, p95_ms: f64, providers: &[(&str, f64)]) -> HistoryEntry {
        HistoryEntry {
            generated_at: at(day),
            window_size: 200,
            success_rate,
            p95_ms,
            provider_fail_rate: providers
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    fn history(entries: Vec<HistoryEntry>) -> BaselineHistory {
        let mut h = BaselineHistory::new();
        for e in entries {
            h.upsert(e);
        }
        h
    }

    #[test]
    fn empty_history_suggests_floors() {
        let b = derive_baseline(&BaselineHistory::new(), at(1));
        assert_eq!(b.sample_count, 0);
        assert_eq!(b.transition_count, 0);
        assert!(!b.ready_for_tuning);
        assert_eq!(b.suggested_thresholds.max_success_drop, SUCCESS_DROP_FLOOR);
        assert_eq!(b.suggested_thresholds.max_p95_increase_ms, P95_INCREASE_FLOOR_MS);
        assert_eq!(
            b.suggested_thresholds.max_provider_failrate_increase,
            PROVIDER_FAILRATE_FLOOR
        );
        assert!(b.suggested_thresholds.provider_overrides.is_empty());
    }

    #[test]
    fn improvements_do_not_count() {
        let h = history(vec![
            entry(1, 0.5, 9_000.0, &[]),
            entry(2, 1.0, 100.0, &[]),
        ]);
        let b = derive_baseline(&h, at(2));
        assert_eq!(b.observed_max, ObservedMaxima::default());
    }

    #[test]
    fn large_degradations_raise_suggestions() {
        let h = history(vec![
            entry(1, 1.0, 1_000.0, &[]),
            entry(2, 0.9, 9_000.0, &[]),
        ]);
        let b = derive_baseline(&h, at(2));
        assert!((b.suggested_thresholds.max_success_drop - 0.1).abs() < 1e-12);
        assert_eq!(b.suggested_thresholds.max_p95_increase_ms, 8_000.0);
        assert_eq!(b.observed_max.p95_increase_ms, 8_000.0);
    }

    #[test]
    fn provider_series_only_for_shared_providers() {
        let h = history(vec![
            entry(1, 1.0, 0.0, &[("fal", 0.0), ("openai", 0.0)]),
            entry(2, 1.0, 0.0, &[("fal", 0.3), ("replicate", 0.9)]),
        ]);
        let b = derive_baseline(&h, at(2));
        let overrides = &b.suggested_thresholds.provider_overrides;
        assert_eq!(overrides.len(), 1);
        assert!((overrides["fal"] - 0.3).abs() < 1e-12);
        assert!(!overrides.contains_key("replicate"));
        assert!(!overrides.contains_key("openai"));
    }

    #[test]
    fn provider_override_never_below_global() {
        let h = history(vec![
            entry(1, 1.0, 0.0, &[("fal", 0.0), ("openai", 0.0)]),
            entry(2, 1.0, 0.0, &[("fal", 0.0), ("openai", 0.5)]),
        ]);
        let b = derive_baseline(&h, at(2));
        let s = &b.suggested_thresholds;
        for value in s.provider_overrides.values() {
            assert!(*value >= s.max_provider_failrate_increase);
        }
        assert_eq!(s.provider_overrides["fal"], s.max_provider_failrate_increase);
    }

    #[test]
    fn readiness_needs_five_transitions() {
        let mut h = BaselineHistory::new();
        let mut readiness = Vec::new();
        for day in 1..=6 {
            h.upsert(entry(day, 1.0, 100.0, &[]));
            readiness.push(derive_baseline(&h, at(day)).ready_for_tuning);
        }
        assert_eq!(readiness, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn env_overrides_roundtrip_through_resolver() {
        let h = history(vec![
            entry(1, 1.0, 0.0, &[("fal", 0.0)]),
            entry(2, 0.8, 0.0, &[("fal", 0.4)]),
        ]);
        let b = derive_baseline(&h, at(2));
        let env = b.suggested_thresholds.to_env_overrides();
        let overrides = tg_config::ThresholdOverrides::from_pairs(&env);
        let resolved = tg_config::resolve(tg_config::Profile::Ci, &overrides, None);
        assert_eq!(resolved.max_success_drop, b.suggested_thresholds.max_success_drop);
        assert_eq!(resolved.provider_failrate_threshold("fal"), b.suggested_thresholds.provider_overrides["fal"]);
    }
}
