//! Key/value threshold overrides.
//!
//! Overrides arrive as environment-style pairs (`TREND_MAX_SUCCESS_DROP=0.02`).
//! Values that do not parse, or that are negative or non-finite, are ignored
//! with a warning and the profile default stays in effect.

use serde_json::Value;
use std::collections::BTreeMap;
use tg_common::{event_names, parse_or_default};

pub const ENV_PROFILE: &str = "TREND_GATE_PROFILE";
pub const ENV_WINDOW_SIZE: &str = "TREND_WINDOW_SIZE";
pub const ENV_MODE: &str = "TREND_GATE_MODE";
pub const ENV_MAX_SUCCESS_DROP: &str = "TREND_MAX_SUCCESS_DROP";
pub const ENV_MAX_P95_INCREASE_MS: &str = "TREND_MAX_P95_INCREASE_MS";
pub const ENV_MAX_PROVIDER_FAILRATE_INCREASE: &str = "TREND_MAX_PROVIDER_FAILRATE_INCREASE";
pub const ENV_MAX_PIPELINE_SUCCESS_DROP: &str = "TREND_MAX_PIPELINE_SUCCESS_DROP";
pub const ENV_MAX_PIPELINE_P95_INCREASE_MS: &str = "TREND_MAX_PIPELINE_P95_INCREASE_MS";
pub const ENV_MAX_PIPELINE_FAILRATE_INCREASE: &str = "TREND_MAX_PIPELINE_FAILRATE_INCREASE";
pub const ENV_FRONTEND_MAX_SUCCESS_DROP: &str = "TREND_FRONTEND_MAX_SUCCESS_DROP";
pub const ENV_FRONTEND_MAX_P95_INCREASE_MS: &str = "TREND_FRONTEND_MAX_P95_INCREASE_MS";
pub const ENV_FRONTEND_MAX_FAILRATE_INCREASE: &str = "TREND_FRONTEND_MAX_FAILRATE_INCREASE";
pub const ENV_MIN_PIPELINE_SAMPLES: &str = "TREND_MIN_PIPELINE_SAMPLES";
pub const ENV_PROVIDER_THRESHOLDS_JSON: &str = "TREND_PROVIDER_THRESHOLDS_JSON";
pub const ENV_MIN_SUCCESS_RATE: &str = "QUALITY_MIN_SUCCESS_RATE";
pub const ENV_MIN_PROVIDER_SUCCESS_RATE: &str = "QUALITY_MIN_PROVIDER_SUCCESS_RATE";
pub const ENV_MAX_P95_MS: &str = "QUALITY_MAX_P95_MS";
pub const ENV_REQUIRE_PROVIDER_EVENTS: &str = "QUALITY_REQUIRE_PROVIDER_EVENTS";

/// Optional overrides for one pipeline scope.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScopeOverrides {
    pub max_success_drop: Option<f64>,
    pub max_p95_increase_ms: Option<f64>,
    pub max_failrate_increase: Option<f64>,
}

impl ScopeOverrides {
    fn layered_over(self, lower: ScopeOverrides) -> ScopeOverrides {
        ScopeOverrides {
            max_success_drop: self.max_success_drop.or(lower.max_success_drop),
            max_p95_increase_ms: self.max_p95_increase_ms.or(lower.max_p95_increase_ms),
            max_failrate_increase: self.max_failrate_increase.or(lower.max_failrate_increase),
        }
    }
}

/// Every value that may replace a profile default.
///
/// Unset fields leave the profile default (or the inherited value) in place.
/// `profile` and `mode` stay as raw text so that unknown names can fall back
/// to their fail-closed defaults at resolution time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdOverrides {
    pub profile: Option<String>,
    pub mode: Option<String>,
    pub window_size: Option<usize>,
    pub max_success_drop: Option<f64>,
    pub max_p95_increase_ms: Option<f64>,
    pub max_provider_failrate_increase: Option<f64>,
    pub pipeline: ScopeOverrides,
    pub frontend: ScopeOverrides,
    pub min_pipeline_samples: Option<u64>,
    pub provider_thresholds_json: Option<String>,
    pub min_success_rate: Option<f64>,
    pub min_provider_success_rate: Option<f64>,
    pub max_p95_ms: Option<f64>,
    pub require_provider_events: Option<bool>,
}

impl ThresholdOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build overrides from key/value pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut o = ThresholdOverrides::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref();
            match key {
                ENV_PROFILE => o.profile = non_empty(value),
                ENV_MODE => o.mode = non_empty(value),
                ENV_WINDOW_SIZE => o.window_size = parse_window(key, value),
                ENV_MAX_SUCCESS_DROP => o.max_success_drop = parse_tolerance(key, value),
                ENV_MAX_P95_INCREASE_MS => o.max_p95_increase_ms = parse_tolerance(key, value),
                ENV_MAX_PROVIDER_FAILRATE_INCREASE => {
                    o.max_provider_failrate_increase = parse_tolerance(key, value)
                }
                ENV_MAX_PIPELINE_SUCCESS_DROP => {
                    o.pipeline.max_success_drop = parse_tolerance(key, value)
                }
                ENV_MAX_PIPELINE_P95_INCREASE_MS => {
                    o.pipeline.max_p95_increase_ms = parse_tolerance(key, value)
                }
                ENV_MAX_PIPELINE_FAILRATE_INCREASE => {
                    o.pipeline.max_failrate_increase = parse_tolerance(key, value)
                }
                ENV_FRONTEND_MAX_SUCCESS_DROP => {
                    o.frontend.max_success_drop = parse_tolerance(key, value)
                }
                ENV_FRONTEND_MAX_P95_INCREASE_MS => {
                    o.frontend.max_p95_increase_ms = parse_tolerance(key, value)
                }
                ENV_FRONTEND_MAX_FAILRATE_INCREASE => {
                    o.frontend.max_failrate_increase = parse_tolerance(key, value)
                }
                ENV_MIN_PIPELINE_SAMPLES => o.min_pipeline_samples = parse_count(key, value),
                ENV_PROVIDER_THRESHOLDS_JSON => o.provider_thresholds_json = non_empty(value),
                ENV_MIN_SUCCESS_RATE => o.min_success_rate = parse_tolerance(key, value),
                ENV_MIN_PROVIDER_SUCCESS_RATE => {
                    o.min_provider_success_rate = parse_tolerance(key, value)
                }
                ENV_MAX_P95_MS => o.max_p95_ms = parse_tolerance(key, value),
                ENV_REQUIRE_PROVIDER_EVENTS => o.require_provider_events = parse_flag(key, value),
                _ => {}
            }
        }
        o
    }

    /// Combine two override layers; values set in `self` win.
    pub fn layered_over(self, lower: ThresholdOverrides) -> ThresholdOverrides {
        ThresholdOverrides {
            profile: self.profile.or(lower.profile),
            mode: self.mode.or(lower.mode),
            window_size: self.window_size.or(lower.window_size),
            max_success_drop: self.max_success_drop.or(lower.max_success_drop),
            max_p95_increase_ms: self.max_p95_increase_ms.or(lower.max_p95_increase_ms),
            max_provider_failrate_increase: self
                .max_provider_failrate_increase
                .or(lower.max_provider_failrate_increase),
            pipeline: self.pipeline.layered_over(lower.pipeline),
            frontend: self.frontend.layered_over(lower.frontend),
            min_pipeline_samples: self.min_pipeline_samples.or(lower.min_pipeline_samples),
            provider_thresholds_json: self
                .provider_thresholds_json
                .or(lower.provider_thresholds_json),
            min_success_rate: self.min_success_rate.or(lower.min_success_rate),
            min_provider_success_rate: self
                .min_provider_success_rate
                .or(lower.min_provider_success_rate),
            max_p95_ms: self.max_p95_ms.or(lower.max_p95_ms),
            require_provider_events: self.require_provider_events.or(lower.require_provider_events),
        }
    }
}

/// Parse a per-provider fail-rate override map.
///
/// Input must be a JSON object. Entries survive only when the key is
/// non-empty after trimming and the value is a finite, non-negative number.
/// Anything else degrades to an empty map.
pub fn parse_provider_overrides(raw: &str) -> BTreeMap<String, f64> {
    let value: Value = parse_or_default(raw, Value::Null);
    let Value::Object(entries) = value else {
        if !raw.trim().is_empty() {
            tracing::warn!(
                target: event_names::CONFIG_OVERRIDE_IGNORED,
                key = ENV_PROVIDER_THRESHOLDS_JSON,
                "provider thresholds are not a JSON object, ignoring"
            );
        }
        return BTreeMap::new();
    };

    let mut map = BTreeMap::new();
    for (key, value) in entries {
        let name = key.trim();
        match value.as_f64() {
            Some(v) if !name.is_empty() && v.is_finite() && v >= 0.0 => {
                map.insert(name.to_string(), v);
            }
            _ => {
                tracing::warn!(
                    target: event_names::CONFIG_OVERRIDE_IGNORED,
                    provider = %key,
                    value = %value,
                    "dropping invalid provider threshold"
                );
            }
        }
    }
    map
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ignored(key: &str, value: &str) {
    tracing::warn!(
        target: event_names::CONFIG_OVERRIDE_IGNORED,
        key,
        value,
        "ignoring invalid override"
    );
}

fn parse_tolerance(key: &str, value: &str) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            ignored(key, value);
            None
        }
    }
}

fn parse_window(key: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(v) if v >= 1 => Some(v),
        _ => {
            ignored(key, value);
            None
        }
    }
}

fn parse_count(key: &str, value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            ignored(key, value);
            None
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            ignored(key, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_known_keys() {
        let o = ThresholdOverrides::from_pairs([
            ("TREND_GATE_PROFILE", "nightly"),
            ("TREND_WINDOW_SIZE", "50"),
            ("TREND_MAX_SUCCESS_DROP", "0.02"),
            ("TREND_FRONTEND_MAX_P95_INCREASE_MS", "4000"),
            ("QUALITY_REQUIRE_PROVIDER_EVENTS", "false"),
            ("HOME", "/root"),
        ]);
        assert_eq!(o.profile.as_deref(), Some("nightly"));
        assert_eq!(o.window_size, Some(50));
        assert_eq!(o.max_success_drop, Some(0.02));
        assert_eq!(o.frontend.max_p95_increase_ms, Some(4000.0));
        assert_eq!(o.require_provider_events, Some(false));
        assert_eq!(o.pipeline, ScopeOverrides::default());
    }

    #[test]
    fn invalid_values_are_ignored() {
        let o = ThresholdOverrides::from_pairs([
            ("TREND_MAX_SUCCESS_DROP", "lots"),
            ("TREND_MAX_P95_INCREASE_MS", "-5"),
            ("TREND_MAX_PROVIDER_FAILRATE_INCREASE", "NaN"),
            ("TREND_WINDOW_SIZE", "0"),
            ("TREND_MIN_PIPELINE_SAMPLES", "-1"),
            ("QUALITY_REQUIRE_PROVIDER_EVENTS", "sometimes"),
            ("TREND_GATE_PROFILE", "   "),
        ]);
        assert_eq!(o, ThresholdOverrides::default());
    }

    #[test]
    fn upper_layer_wins() {
        let cli = ThresholdOverrides {
            max_success_drop: Some(0.5),
            ..Default::default()
        };
        let env = ThresholdOverrides::from_pairs([
            ("TREND_MAX_SUCCESS_DROP", "0.02"),
            ("TREND_MAX_P95_INCREASE_MS", "300"),
        ]);
        let merged = cli.layered_over(env);
        assert_eq!(merged.max_success_drop, Some(0.5));
        assert_eq!(merged.max_p95_increase_ms, Some(300.0));
    }

    #[test]
    fn provider_overrides_filter_invalid_entries() {
        let map = parse_provider_overrides(
            r#"{"fal": 0.2, "openai": "high", "": 0.1, " ": 0.3, "neg": -0.1, "zero": 0}"#,
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("fal"), Some(&0.2));
        assert_eq!(map.get("zero"), Some(&0.0));
    }

    #[test]
    fn malformed_provider_overrides_degrade_to_empty() {
        assert!(parse_provider_overrides("{not json").is_empty());
        assert!(parse_provider_overrides("[1,2]").is_empty());
        assert!(parse_provider_overrides("0.5").is_empty());
        assert!(parse_provider_overrides("").is_empty());
    }
}
