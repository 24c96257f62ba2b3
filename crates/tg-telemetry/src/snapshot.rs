//! Window summaries and trend snapshots.
//!
//! A pipeline or provider absent from a window has no entry in that window's
//! maps. Absence means "not observed", which is different from an explicit
//! row with zero attempts.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tg_common::{Error, Result, SCHEMA_VERSION};

use crate::persist::{read_json, write_json_atomic};

/// Metrics for one pipeline within one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineMetrics {
    /// Completed attempts (`success` + `error`).
    pub attempts: u64,
    pub successes: u64,
    pub errors: u64,
    pub success_rate: f64,
    pub fail_rate: f64,
    pub p95_ms: f64,
}

/// Health metrics for a single window of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowMetricsSummary {
    /// Records considered, including `start` records.
    pub window_events: u64,
    pub attempts: u64,
    pub successes: u64,
    pub errors: u64,
    /// successes / attempts; 0 with no attempts.
    pub overall_success_rate: f64,
    /// p95 of success durations; 0 with no durations.
    pub overall_p95_ms: f64,
    /// provider -> errors / attempts, for provider-tagged records.
    pub provider_fail_rate: BTreeMap<String, f64>,
    /// provider -> attempts, for provider-tagged records.
    pub provider_attempts: BTreeMap<String, u64>,
    /// pipeline -> metrics, for records carrying a pipeline.
    pub pipeline_metrics: BTreeMap<String, PipelineMetrics>,
}

impl WindowMetricsSummary {
    /// Whether any provider-tagged record was seen in this window.
    pub fn has_provider_events(&self) -> bool {
        !self.provider_attempts.is_empty() || !self.provider_fail_rate.is_empty()
    }

    /// Attempts recorded for a pipeline, 0 when the pipeline is absent.
    pub fn pipeline_attempts(&self, pipeline: &str) -> u64 {
        self.pipeline_metrics
            .get(pipeline)
            .map(|m| m.attempts)
            .unwrap_or(0)
    }
}

/// Signed differences, current minus previous.
///
/// Map keys are the union of keys present in either window; a key missing on
/// one side counts as zero for the subtraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendDelta {
    pub success_rate: f64,
    pub p95_ms: f64,
    pub provider_fail_rate: BTreeMap<String, f64>,
    pub pipeline_success_rate: BTreeMap<String, f64>,
    pub pipeline_p95_ms: BTreeMap<String, f64>,
    pub pipeline_fail_rate: BTreeMap<String, f64>,
}

/// A current window, the window immediately before it, and their deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub window_size: usize,
    pub current: WindowMetricsSummary,
    pub previous: WindowMetricsSummary,
    #[serde(default)]
    pub delta: TrendDelta,
}

impl TrendSnapshot {
    /// `false` when the previous window is empty: the "no baseline" state.
    pub fn has_baseline(&self) -> bool {
        self.previous.window_events > 0
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Read a trend snapshot document. Any failure is fatal to the caller.
pub fn read_snapshot(path: &Path) -> Result<TrendSnapshot> {
    read_json(path).map_err(|reason| Error::SnapshotCorrupted {
        path: path.to_path_buf(),
        reason,
    })
}

/// Write a trend snapshot document.
pub fn write_snapshot(path: &Path, snapshot: &TrendSnapshot) -> Result<()> {
    write_json_atomic(path, snapshot)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> TrendSnapshot {
        let mut current = WindowMetricsSummary {
            window_events: 5,
            attempts: 5,
            successes: 4,
            errors: 1,
            overall_success_rate: 0.8,
            overall_p95_ms: 400.0,
            ..Default::default()
        };
        current.provider_fail_rate.insert("fal".into(), 0.25);
        current.provider_attempts.insert("fal".into(), 4);
        TrendSnapshot {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            window_size: 5,
            current,
            previous: WindowMetricsSummary::default(),
            delta: TrendDelta::default(),
        }
    }

    #[test]
    fn empty_previous_means_no_baseline() {
        assert!(!sample().has_baseline());
    }

    #[test]
    fn snapshot_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trend.json");
        let snapshot = sample();
        write_snapshot(&path, &snapshot).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn missing_snapshot_is_fatal() {
        let dir = tempdir().unwrap();
        let err = read_snapshot(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code(), 22);
    }

    #[test]
    fn summary_fields_default_when_absent() {
        let json = r#"{
            "generated_at": "2026-01-01T00:00:00Z",
            "window_size": 10,
            "current": {"window_events": 3, "overall_success_rate": 1.0},
            "previous": {}
        }"#;
        let snap: TrendSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.schema_version, SCHEMA_VERSION);
        assert_eq!(snap.current.window_events, 3);
        assert!(snap.current.pipeline_metrics.is_empty());
        assert!(!snap.has_baseline());
    }

    #[test]
    fn provider_presence() {
        assert!(sample().current.has_provider_events());
        assert!(!sample().previous.has_provider_events());
    }
}
