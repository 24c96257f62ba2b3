//! Regression gate: current window against the immediately preceding one.
//!
//! Every check runs; violations are collected, never short-circuited. The
//! failure list does not depend on the gate mode, only the decision label
//! does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tg_common::{event_names, SCHEMA_VERSION};
use tg_config::{GateConfig, GateMode, Profile, ThresholdSet};
use tg_telemetry::TrendSnapshot;

use super::{fmt_ms, fmt_rate, join_failures, Decision};
use crate::trend::{compute_delta, union_keys};

/// Coverage counters, so a PASS with nothing evaluated is visible.
///
/// `pipelines_candidate` always equals evaluated + both skipped counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionCounters {
    pub pipelines_candidate: u64,
    pub pipelines_evaluated: u64,
    pub pipelines_skipped_no_baseline: u64,
    pub pipelines_skipped_low_samples: u64,
    pub providers_evaluated: u64,
}

/// Result of comparing one snapshot against one threshold set.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionEvaluation {
    pub decision: Decision,
    pub counters: RegressionCounters,
    pub failures: Vec<String>,
}

/// How one pipeline is treated by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineCoverage {
    Evaluated,
    NoBaseline,
    LowSamples,
}

fn classify(current_attempts: u64, previous_attempts: u64, min_samples: u64) -> PipelineCoverage {
    if previous_attempts == 0 {
        PipelineCoverage::NoBaseline
    } else if current_attempts == 0
        || current_attempts < min_samples
        || previous_attempts < min_samples
    {
        PipelineCoverage::LowSamples
    } else {
        PipelineCoverage::Evaluated
    }
}

/// Evaluate a snapshot against resolved thresholds.
pub fn evaluate_regression(
    snapshot: &TrendSnapshot,
    thresholds: &ThresholdSet,
    mode: GateMode,
) -> RegressionEvaluation {
    let mut counters = RegressionCounters::default();
    let pipelines = union_keys(
        &snapshot.current.pipeline_metrics,
        &snapshot.previous.pipeline_metrics,
    );
    counters.pipelines_candidate = pipelines.len() as u64;

    if !snapshot.has_baseline() {
        counters.pipelines_skipped_no_baseline = counters.pipelines_candidate;
        return RegressionEvaluation {
            decision: Decision::SkippedNoBaseline,
            counters,
            failures: Vec::new(),
        };
    }

    // Derived from the summaries; a stored delta may be stale or missing.
    let delta = compute_delta(&snapshot.current, &snapshot.previous);
    let mut failures = Vec::new();

    let success_drop = -delta.success_rate;
    if success_drop > thresholds.max_success_drop {
        failures.push(format!(
            "overall success drop {} > {}",
            fmt_rate(success_drop),
            fmt_rate(thresholds.max_success_drop)
        ));
    }
    if delta.p95_ms > thresholds.max_p95_increase_ms {
        failures.push(format!(
            "overall p95 increase {} > {}",
            fmt_ms(delta.p95_ms),
            fmt_ms(thresholds.max_p95_increase_ms)
        ));
    }

    for (provider, increase) in &delta.provider_fail_rate {
        counters.providers_evaluated += 1;
        let limit = thresholds.provider_failrate_threshold(provider);
        if *increase > limit {
            failures.push(format!(
                "provider {} fail-rate increase {} > {}",
                provider,
                fmt_rate(*increase),
                fmt_rate(limit)
            ));
        }
    }

    for pipeline in pipelines {
        let current = snapshot.current.pipeline_attempts(pipeline);
        let previous = snapshot.previous.pipeline_attempts(pipeline);
        match classify(current, previous, thresholds.min_pipeline_samples) {
            PipelineCoverage::NoBaseline => {
                counters.pipelines_skipped_no_baseline += 1;
                continue;
            }
            PipelineCoverage::LowSamples => {
                counters.pipelines_skipped_low_samples += 1;
                tracing::debug!(
                    target: event_names::GATE_PIPELINE_SKIPPED,
                    pipeline,
                    current,
                    previous,
                    min_samples = thresholds.min_pipeline_samples,
                    "pipeline below sample floor"
                );
                continue;
            }
            PipelineCoverage::Evaluated => counters.pipelines_evaluated += 1,
        }

        let scope = thresholds.scope_for(pipeline);
        let drop = -delta
            .pipeline_success_rate
            .get(pipeline)
            .copied()
            .unwrap_or(0.0);
        let p95_increase = delta.pipeline_p95_ms.get(pipeline).copied().unwrap_or(0.0);
        let fail_increase = delta
            .pipeline_fail_rate
            .get(pipeline)
            .copied()
            .unwrap_or(0.0);

        if drop > scope.max_success_drop {
            failures.push(format!(
                "pipeline {} success drop {} > {}",
                pipeline,
                fmt_rate(drop),
                fmt_rate(scope.max_success_drop)
            ));
        }
        if p95_increase > scope.max_p95_increase_ms {
            failures.push(format!(
                "pipeline {} p95 increase {} > {}",
                pipeline,
                fmt_ms(p95_increase),
                fmt_ms(scope.max_p95_increase_ms)
            ));
        }
        if fail_increase > scope.max_failrate_increase {
            failures.push(format!(
                "pipeline {} fail-rate increase {} > {}",
                pipeline,
                fmt_rate(fail_increase),
                fmt_rate(scope.max_failrate_increase)
            ));
        }
    }

    for failure in &failures {
        tracing::debug!(target: event_names::GATE_VIOLATION, failure = %failure, "threshold exceeded");
    }

    RegressionEvaluation {
        decision: Decision::from_failures(mode, &failures),
        counters,
        failures,
    }
}

/// Structured output of the regression gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionGateReport {
    pub schema_version: String,
    /// Generation time of the evaluated snapshot.
    pub generated_at: DateTime<Utc>,
    pub decision: Decision,
    pub mode: GateMode,
    pub profile: Profile,
    pub window_size: usize,
    pub current_events: u64,
    pub previous_events: u64,
    pub thresholds: ThresholdSet,
    pub counters: RegressionCounters,
    pub failures: Vec<String>,
    pub exit_code: i32,
}

impl RegressionGateReport {
    /// One-line rendering for log scraping.
    pub fn summary_line(&self) -> String {
        format!(
            "{} mode={} profile={} current_events={} previous_events={} pipelines_evaluated={}/{} providers_evaluated={} failures={}",
            self.decision,
            self.mode,
            self.profile,
            self.current_events,
            self.previous_events,
            self.counters.pipelines_evaluated,
            self.counters.pipelines_candidate,
            self.counters.providers_evaluated,
            join_failures(&self.failures),
        )
    }
}

/// Run the regression gate and assemble its report.
pub fn regression_gate(snapshot: &TrendSnapshot, config: &GateConfig) -> RegressionGateReport {
    let evaluation = evaluate_regression(snapshot, &config.thresholds, config.mode);
    RegressionGateReport {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at: snapshot.generated_at,
        decision: evaluation.decision,
        mode: config.mode,
        profile: config.profile,
        window_size: snapshot.window_size,
        current_events: snapshot.current.window_events,
        previous_events: snapshot.previous.window_events,
        thresholds: config.thresholds.clone(),
        counters: evaluation.counters,
        exit_code: evaluation.decision.exit_code().as_i32(),
        failures: evaluation.failures,
    }
}
