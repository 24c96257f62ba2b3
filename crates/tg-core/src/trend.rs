//! Trend snapshot builder.
//!
//! Windows are event-count based: the current window is the last
//! `window_size` records and the previous window is the `window_size`
//! records immediately before it. With fewer than `2 * window_size` records
//! the previous window is shorter, and with at most `window_size` it is
//! empty (no baseline).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tg_common::{event_names, EventRecord, SCHEMA_VERSION};
use tg_telemetry::{TrendDelta, TrendSnapshot, WindowMetricsSummary};

use crate::summarize::summarize;

/// Split events into `(previous, current)` windows.
pub fn split_windows(events: &[EventRecord], window_size: usize) -> (&[EventRecord], &[EventRecord]) {
    let current_start = events.len().saturating_sub(window_size);
    let previous_start = current_start.saturating_sub(window_size);
    (
        &events[previous_start..current_start],
        &events[current_start..],
    )
}

/// Build a snapshot stamped with the current time.
pub fn build(events: &[EventRecord], window_size: usize) -> TrendSnapshot {
    build_at(events, window_size, Utc::now())
}

/// Build a snapshot with an explicit generation time.
pub fn build_at(
    events: &[EventRecord],
    window_size: usize,
    generated_at: DateTime<Utc>,
) -> TrendSnapshot {
    let (previous_events, current_events) = split_windows(events, window_size);
    let current = summarize(current_events);
    let previous = summarize(previous_events);
    let delta = compute_delta(&current, &previous);

    tracing::debug!(
        target: event_names::SNAPSHOT_BUILT,
        window_size,
        current_events = current.window_events,
        previous_events = previous.window_events,
        "trend snapshot built"
    );

    TrendSnapshot {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at,
        window_size,
        current,
        previous,
        delta,
    }
}

/// Signed per-key differences, current minus previous.
pub fn compute_delta(current: &WindowMetricsSummary, previous: &WindowMetricsSummary) -> TrendDelta {
    let provider_fail_rate = diff_by_key(
        &current.provider_fail_rate,
        &previous.provider_fail_rate,
        |v| *v,
    );
    let pipeline_success_rate = diff_by_key(
        &current.pipeline_metrics,
        &previous.pipeline_metrics,
        |m| m.success_rate,
    );
    let pipeline_p95_ms = diff_by_key(
        &current.pipeline_metrics,
        &previous.pipeline_metrics,
        |m| m.p95_ms,
    );
    let pipeline_fail_rate = diff_by_key(
        &current.pipeline_metrics,
        &previous.pipeline_metrics,
        |m| m.fail_rate,
    );

    TrendDelta {
        success_rate: current.overall_success_rate - previous.overall_success_rate,
        p95_ms: current.overall_p95_ms - previous.overall_p95_ms,
        provider_fail_rate,
        pipeline_success_rate,
        pipeline_p95_ms,
        pipeline_fail_rate,
    }
}

/// Recompute a snapshot's delta from its two summaries.
///
/// Used on snapshots read from disk, whose `delta` may be absent or edited.
pub fn rederive_delta(mut snapshot: TrendSnapshot) -> TrendSnapshot {
    snapshot.delta = compute_delta(&snapshot.current, &snapshot.previous);
    snapshot
}

/// Every key in `keys(a) ∪ keys(b)`, in order.
pub fn union_keys<'a, V>(a: &'a BTreeMap<String, V>, b: &'a BTreeMap<String, V>) -> BTreeSet<&'a str> {
    a.keys().chain(b.keys()).map(String::as_str).collect()
}

fn diff_by_key<V>(
    current: &BTreeMap<String, V>,
    previous: &BTreeMap<String, V>,
    metric: impl Fn(&V) -> f64,
) -> BTreeMap<String, f64> {
    union_keys(current, previous)
        .into_iter()
        .map(|key| {
            let cur = current.get(key).map(&metric).unwrap_or(0.0);
            let prev = previous.get(key).map(&metric).unwrap_or(0.0);
            (key.to_string(), cur - prev)
        })
        .collect()
}
