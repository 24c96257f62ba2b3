//! Absolute threshold gate: the current window against fixed floors.
//!
//! Unlike the regression gate, an empty window is a violation here: with no
//! attempts there is nothing to vouch for the build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tg_common::SCHEMA_VERSION;
use tg_config::{AbsoluteThresholds, GateConfig, GateMode, Profile};
use tg_telemetry::{TrendSnapshot, WindowMetricsSummary};

use super::{fmt_ms, fmt_rate, join_failures, Decision};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteCounters {
    pub providers_evaluated: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbsoluteEvaluation {
    pub decision: Decision,
    pub counters: AbsoluteCounters,
    pub failures: Vec<String>,
}

/// Evaluate one window against absolute thresholds.
pub fn evaluate_absolute(
    current: &WindowMetricsSummary,
    thresholds: &AbsoluteThresholds,
    mode: GateMode,
) -> AbsoluteEvaluation {
    let mut counters = AbsoluteCounters::default();
    let mut failures = Vec::new();

    if current.attempts == 0 {
        failures.push("no attempts in current window".to_string());
    } else {
        if current.overall_success_rate < thresholds.min_success_rate {
            failures.push(format!(
                "overall success rate {} < {}",
                fmt_rate(current.overall_success_rate),
                fmt_rate(thresholds.min_success_rate)
            ));
        }

        for (provider, attempts) in &current.provider_attempts {
            if *attempts == 0 {
                continue;
            }
            counters.providers_evaluated += 1;
            let fail_rate = current
                .provider_fail_rate
                .get(provider)
                .copied()
                .unwrap_or(0.0);
            let success_rate = 1.0 - fail_rate;
            if success_rate < thresholds.min_provider_success_rate {
                failures.push(format!(
                    "provider {} success rate {} < {}",
                    provider,
                    fmt_rate(success_rate),
                    fmt_rate(thresholds.min_provider_success_rate)
                ));
            }
        }

        if current.overall_p95_ms > thresholds.max_p95_ms {
            failures.push(format!(
                "overall p95 {} > {}",
                fmt_ms(current.overall_p95_ms),
                fmt_ms(thresholds.max_p95_ms)
            ));
        }
    }

    if thresholds.require_provider_events && !current.has_provider_events() {
        failures.push("no provider-tagged events in current window".to_string());
    }

    AbsoluteEvaluation {
        decision: Decision::from_failures(mode, &failures),
        counters,
        failures,
    }
}

/// Structured output of the absolute gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteGateReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub decision: Decision,
    pub mode: GateMode,
    pub profile: Profile,
    pub current_events: u64,
    pub attempts: u64,
    pub thresholds: AbsoluteThresholds,
    pub counters: AbsoluteCounters,
    pub failures: Vec<String>,
    pub exit_code: i32,
}

impl AbsoluteGateReport {
    /// One-line rendering for log scraping.
    pub fn summary_line(&self) -> String {
        format!(
            "{} mode={} profile={} current_events={} attempts={} providers_evaluated={} failures={}",
            self.decision,
            self.mode,
            self.profile,
            self.current_events,
            self.attempts,
            self.counters.providers_evaluated,
            join_failures(&self.failures),
        )
    }
}

/// Run the absolute gate on a snapshot's current window.
pub fn absolute_gate(snapshot: &TrendSnapshot, config: &GateConfig) -> AbsoluteGateReport {
    let evaluation = evaluate_absolute(&snapshot.current, &config.absolute, config.mode);
    AbsoluteGateReport {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at: snapshot.generated_at,
        decision: evaluation.decision,
        mode: config.mode,
        profile: config.profile,
        current_events: snapshot.current.window_events,
        attempts: snapshot.current.attempts,
        thresholds: config.absolute.clone(),
        counters: evaluation.counters,
        exit_code: evaluation.decision.exit_code().as_i32(),
        failures: evaluation.failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::summarize;
    use tg_common::EventRecord;

    fn floors(require_provider_events: bool) -> AbsoluteThresholds {
        AbsoluteThresholds {
            min_success_rate: 0.9,
            min_provider_success_rate: 0.85,
            max_p95_ms: 1_000.0,
            require_provider_events,
        }
    }

    #[test]
    fn empty_window_fails_closed() {
        let eval = evaluate_absolute(&summarize(&[]), &floors(false), GateMode::Block);
        assert_eq!(eval.decision, Decision::Fail);
        assert_eq!(eval.failures, vec!["no attempts in current window".to_string()]);
    }

    #[test]
    fn start_only_window_fails_closed() {
        let s = summarize(&[EventRecord::start("p")]);
        let eval = evaluate_absolute(&s, &floors(false), GateMode::Block);
        assert_eq!(eval.decision, Decision::Fail);
    }

    #[test]
    fn healthy_window_passes() {
        let events: Vec<_> = (0..10)
            .map(|_| EventRecord::success("p", 200.0).with_provider("fal"))
            .collect();
        let eval = evaluate_absolute(&summarize(&events), &floors(true), GateMode::Block);
        assert_eq!(eval.decision, Decision::Pass);
        assert_eq!(eval.counters.providers_evaluated, 1);
    }

    #[test]
    fn every_floor_is_checked() {
        let mut events = vec![EventRecord::success("p", 5_000.0).with_provider("fal"); 3];
        events.push(EventRecord::error("p").with_provider("fal"));
        let eval = evaluate_absolute(&summarize(&events), &floors(false), GateMode::Warn);
        assert_eq!(
            eval.failures,
            vec![
                "overall success rate 0.7500 < 0.9000".to_string(),
                "provider fal success rate 0.7500 < 0.8500".to_string(),
                "overall p95 5000ms > 1000ms".to_string(),
            ]
        );
        assert_eq!(eval.decision, Decision::Warn);
    }

    #[test]
    fn provider_events_required() {
        let events = vec![EventRecord::success("p", 10.0)];
        let eval = evaluate_absolute(&summarize(&events), &floors(true), GateMode::Block);
        assert_eq!(
            eval.failures,
            vec!["no provider-tagged events in current window".to_string()]
        );
        let eval = evaluate_absolute(&summarize(&events), &floors(false), GateMode::Block);
        assert!(eval.failures.is_empty());
    }

    #[test]
    fn start_only_provider_is_not_evaluated() {
        let events = vec![
            EventRecord::start("p").with_provider("openai"),
            EventRecord::success("p", 10.0),
        ];
        let eval = evaluate_absolute(&summarize(&events), &floors(true), GateMode::Block);
        assert_eq!(eval.counters.providers_evaluated, 0);
        assert_eq!(eval.decision, Decision::Pass);
    }
}
