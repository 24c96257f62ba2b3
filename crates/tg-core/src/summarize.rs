//! Window summarizer.
//!
//! Reduces an ordered slice of events to a [`WindowMetricsSummary`] in a
//! single pass. Pure and total: empty input yields an all-zero summary.

use std::collections::BTreeMap;

use tg_common::{EventRecord, EventStatus};
use tg_math::{percentile, ratio, P95};
use tg_telemetry::{PipelineMetrics, WindowMetricsSummary};

/// Running counters for one aggregation key.
#[derive(Debug, Default)]
struct Tally {
    successes: u64,
    errors: u64,
    durations: Vec<f64>,
}

impl Tally {
    fn record(&mut self, event: &EventRecord) {
        match event.status {
            EventStatus::Success => self.successes += 1,
            EventStatus::Error => self.errors += 1,
            EventStatus::Start => {}
        }
        if let Some(d) = event.success_duration() {
            self.durations.push(d);
        }
    }

    fn attempts(&self) -> u64 {
        self.successes + self.errors
    }

    fn success_rate(&self) -> f64 {
        ratio(self.successes, self.attempts())
    }

    fn fail_rate(&self) -> f64 {
        ratio(self.errors, self.attempts())
    }

    fn p95(&self) -> f64 {
        percentile(&self.durations, P95)
    }
}

/// Summarize one window of events.
pub fn summarize(events: &[EventRecord]) -> WindowMetricsSummary {
    let mut overall = Tally::default();
    let mut providers: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut pipelines: BTreeMap<&str, Tally> = BTreeMap::new();

    for event in events {
        overall.record(event);
        if let Some(provider) = event.provider() {
            providers.entry(provider).or_default().record(event);
        }
        if let Some(pipeline) = event.pipeline() {
            pipelines.entry(pipeline).or_default().record(event);
        }
    }

    let provider_fail_rate = providers
        .iter()
        .map(|(name, t)| (name.to_string(), t.fail_rate()))
        .collect();
    let provider_attempts = providers
        .iter()
        .map(|(name, t)| (name.to_string(), t.attempts()))
        .collect();
    let pipeline_metrics = pipelines
        .iter()
        .map(|(name, t)| {
            let metrics = PipelineMetrics {
                attempts: t.attempts(),
                successes: t.successes,
                errors: t.errors,
                success_rate: t.success_rate(),
                fail_rate: t.fail_rate(),
                p95_ms: t.p95(),
            };
            (name.to_string(), metrics)
        })
        .collect();

    WindowMetricsSummary {
        window_events: events.len() as u64,
        attempts: overall.attempts(),
        successes: overall.successes,
        errors: overall.errors,
        overall_success_rate: overall.success_rate(),
        overall_p95_ms: overall.p95(),
        provider_fail_rate,
        provider_attempts,
        pipeline_metrics,
    }
}
