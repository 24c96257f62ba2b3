//! Semantic validation of resolved configuration.

use crate::resolve::GateConfig;
use crate::thresholds::{AbsoluteThresholds, ScopeThresholds, ThresholdSet};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::UnknownProfile(_) => 65,
            ValidationError::InvalidValue { .. } => 66,
        }
    }

    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a fully resolved gate configuration.
pub fn validate_config(config: &GateConfig) -> ValidationResult<()> {
    validate_window_size(config.window_size)?;
    validate_thresholds(&config.thresholds)?;
    validate_absolute(&config.absolute)?;
    Ok(())
}

/// Validate the window size alone, for commands that never read thresholds.
pub fn validate_window_size(window_size: usize) -> ValidationResult<()> {
    if window_size == 0 {
        return Err(ValidationError::invalid("window_size", "must be at least 1"));
    }
    Ok(())
}

/// Validate regression thresholds: rates in [0, 1], latencies finite and non-negative.
///
/// Provider overrides are not checked here: `parse_provider_overrides` has
/// already dropped bad entries, and any finite non-negative tolerance is kept.
pub fn validate_thresholds(t: &ThresholdSet) -> ValidationResult<()> {
    check_rate("max_success_drop", t.max_success_drop)?;
    check_ms("max_p95_increase_ms", t.max_p95_increase_ms)?;
    check_rate("max_provider_failrate_increase", t.max_provider_failrate_increase)?;
    check_scope("pipeline", &t.pipeline)?;
    check_scope("frontend", &t.frontend)?;
    Ok(())
}

/// Validate quality-gate thresholds.
pub fn validate_absolute(a: &AbsoluteThresholds) -> ValidationResult<()> {
    check_rate("min_success_rate", a.min_success_rate)?;
    check_rate("min_provider_success_rate", a.min_provider_success_rate)?;
    check_ms("max_p95_ms", a.max_p95_ms)?;
    Ok(())
}

fn check_scope(scope: &str, s: &ScopeThresholds) -> ValidationResult<()> {
    check_rate(&format!("{}.max_success_drop", scope), s.max_success_drop)?;
    check_ms(&format!("{}.max_p95_increase_ms", scope), s.max_p95_increase_ms)?;
    check_rate(&format!("{}.max_failrate_increase", scope), s.max_failrate_increase)?;
    Ok(())
}

fn check_rate(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::invalid(
            field,
            format!("must be a rate in [0, 1], got {}", value),
        ));
    }
    Ok(())
}

fn check_ms(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::invalid(
            field,
            format!("must be a finite, non-negative millisecond value, got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::ThresholdOverrides;
    use crate::profile::Profile;

    #[test]
    fn builtin_profiles_are_valid() {
        for p in Profile::ALL {
            validate_config(&GateConfig::for_profile(*p)).unwrap();
        }
    }

    #[test]
    fn rate_above_one_is_rejected() {
        let o = ThresholdOverrides::from_pairs([("TREND_MAX_SUCCESS_DROP", "1.5")]);
        let err = validate_config(&GateConfig::resolve(&o, None)).unwrap_err();
        match &err {
            ValidationError::InvalidValue { field, .. } => assert_eq!(field, "max_success_drop"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.code(), 66);
    }

    #[test]
    fn provider_override_above_one_is_kept() {
        let config = GateConfig::resolve(&ThresholdOverrides::default(), Some(r#"{"fal": 3}"#));
        validate_config(&config).unwrap();
        assert_eq!(config.thresholds.provider_failrate_threshold("fal"), 3.0);
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = GateConfig::for_profile(Profile::Ci);
        config.window_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn infinite_latency_is_rejected() {
        let mut config = GateConfig::for_profile(Profile::Ci);
        config.absolute.max_p95_ms = f64::INFINITY;
        assert!(validate_config(&config).is_err());
    }
}
