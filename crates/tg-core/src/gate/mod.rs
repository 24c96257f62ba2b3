//! Gate decisions.
//!
//! Two gates share one decision vocabulary:
//! - [`regression`]: current window against the previous window
//! - [`absolute`]: current window against fixed floors
//!
//! Gate outcomes are ordinary values. Only `FAIL` maps to a non-zero exit.

pub mod absolute;
pub mod regression;

pub use absolute::{absolute_gate, evaluate_absolute, AbsoluteCounters, AbsoluteGateReport};
pub use regression::{evaluate_regression, regression_gate, RegressionCounters, RegressionGateReport};

use serde::{Deserialize, Serialize};
use std::fmt;
use tg_config::GateMode;

use crate::exit_codes::ExitCode;

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Pass,
    Warn,
    Fail,
    /// The previous window was empty; nothing was compared.
    SkippedNoBaseline,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Pass => "PASS",
            Decision::Warn => "WARN",
            Decision::Fail => "FAIL",
            Decision::SkippedNoBaseline => "SKIPPED_NO_BASELINE",
        }
    }

    /// Decision for a completed comparison with the given violations.
    pub fn from_failures(mode: GateMode, failures: &[String]) -> Decision {
        match (failures.is_empty(), mode) {
            (true, _) => Decision::Pass,
            (false, GateMode::Block) => Decision::Fail,
            (false, GateMode::Warn) => Decision::Warn,
        }
    }

    /// Process exit signal for this decision.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Decision::Fail => ExitCode::GateFailed,
            Decision::Pass | Decision::Warn | Decision::SkippedNoBaseline => ExitCode::Clean,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rates in failure strings: four decimals.
pub(crate) fn fmt_rate(value: f64) -> String {
    format!("{:.4}", value)
}

/// Latencies in failure strings: whole milliseconds.
pub(crate) fn fmt_ms(value: f64) -> String {
    format!("{:.0}ms", value)
}

/// Failures joined for one-line renderings.
pub(crate) fn join_failures(failures: &[String]) -> String {
    if failures.is_empty() {
        "-".to_string()
    } else {
        failures.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_serialize_upper_snake() {
        assert_eq!(serde_json::to_string(&Decision::Pass).unwrap(), "\"PASS\"");
        assert_eq!(
            serde_json::to_string(&Decision::SkippedNoBaseline).unwrap(),
            "\"SKIPPED_NO_BASELINE\""
        );
        for d in [Decision::Pass, Decision::Warn, Decision::Fail, Decision::SkippedNoBaseline] {
            assert_eq!(serde_json::to_string(&d).unwrap(), format!("\"{}\"", d));
        }
    }

    #[test]
    fn only_fail_is_non_zero() {
        assert_eq!(Decision::Fail.exit_code(), ExitCode::GateFailed);
        assert!(Decision::Warn.exit_code().is_success());
        assert!(Decision::SkippedNoBaseline.exit_code().is_success());
        assert!(Decision::Pass.exit_code().is_success());
    }

    #[test]
    fn mode_selects_label() {
        let failures = vec!["x".to_string()];
        assert_eq!(Decision::from_failures(GateMode::Block, &failures), Decision::Fail);
        assert_eq!(Decision::from_failures(GateMode::Warn, &failures), Decision::Warn);
        assert_eq!(Decision::from_failures(GateMode::Block, &[]), Decision::Pass);
    }

    #[test]
    fn number_formats() {
        assert_eq!(fmt_rate(0.19999999999999996), "0.2000");
        assert_eq!(fmt_rate(0.01), "0.0100");
        assert_eq!(fmt_ms(900.4), "900ms");
    }
}
