//! Baseline history store.
//!
//! One entry per trend snapshot generation, deduplicated by `generated_at`
//! and kept in `generated_at` order. The whole document is read, modified
//! and written back as one sequence; callers must serialize concurrent
//! writers against the same file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tg_common::{event_names, parse_value_or_default, Error, Result, SCHEMA_VERSION};

use crate::persist::write_json_atomic;
use crate::snapshot::TrendSnapshot;

/// One durable record of a current-window summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub generated_at: DateTime<Utc>,
    pub window_size: usize,
    pub success_rate: f64,
    pub p95_ms: f64,
    #[serde(default)]
    pub provider_fail_rate: BTreeMap<String, f64>,
}

impl HistoryEntry {
    /// Capture the current window of a snapshot.
    pub fn from_snapshot(snapshot: &TrendSnapshot) -> Self {
        HistoryEntry {
            generated_at: snapshot.generated_at,
            window_size: snapshot.window_size,
            success_rate: snapshot.current.overall_success_rate,
            p95_ms: snapshot.current.overall_p95_ms,
            provider_fail_rate: snapshot.current.provider_fail_rate.clone(),
        }
    }
}

/// The persisted history document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineHistory {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub entries: Vec<HistoryEntry>,
}

impl Default for BaselineHistory {
    fn default() -> Self {
        BaselineHistory {
            schema_version: SCHEMA_VERSION.to_string(),
            entries: Vec::new(),
        }
    }
}

impl BaselineHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry, replacing any entry with the same `generated_at`.
    pub fn upsert(&mut self, entry: HistoryEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.generated_at == entry.generated_at)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.entries.sort_by_key(|e| e.generated_at);
    }

    /// Consecutive `(earlier, later)` entry pairs.
    pub fn transitions(&self) -> impl Iterator<Item = (&HistoryEntry, &HistoryEntry)> {
        self.entries.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Number of consecutive pairs: `len - 1`, or 0 for an empty history.
    pub fn transition_count(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Entries that fail to decode are dropped; the rest of the history survives.
fn lenient_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<HistoryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = raw.len();
    let mut entries: Vec<HistoryEntry> = raw
        .into_iter()
        .filter_map(|v| parse_value_or_default::<Option<HistoryEntry>>(v, None))
        .collect();
    if entries.len() < total {
        tracing::warn!(
            target: event_names::STORE_ENTRIES_DROPPED,
            dropped = total - entries.len(),
            "dropped undecodable history entries"
        );
    }
    entries.sort_by_key(|e| e.generated_at);
    Ok(entries)
}

/// Load a history file. A missing file is an empty history; an unreadable
/// or unparseable one is an error.
pub fn load_history(path: &Path) -> Result<BaselineHistory> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(
                target: event_names::STORE_HISTORY_MISSING,
                path = %path.display(),
                "no history file, starting empty"
            );
            return Ok(BaselineHistory::new());
        }
        Err(e) => {
            return Err(Error::HistoryCorrupted {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };
    serde_json::from_str(&content).map_err(|e| Error::HistoryCorrupted {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write a history file atomically.
pub fn save_history(path: &Path, history: &BaselineHistory) -> Result<()> {
    write_json_atomic(path, history)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(ts: &str, success_rate: f64) -> HistoryEntry {
        HistoryEntry {
            generated_at: ts.parse().unwrap(),
            window_size: 10,
            success_rate,
            p95_ms: 100.0,
            provider_fail_rate: BTreeMap::new(),
        }
    }

    #[test]
    fn upsert_replaces_same_timestamp() {
        let mut h = BaselineHistory::new();
        h.upsert(entry("2026-01-01T00:00:00Z", 1.0));
        h.upsert(entry("2026-01-01T00:00:00Z", 0.5));
        assert_eq!(h.len(), 1);
        assert_eq!(h.entries[0].success_rate, 0.5);
    }

    #[test]
    fn upsert_keeps_chronological_order() {
        let mut h = BaselineHistory::new();
        h.upsert(entry("2026-01-03T00:00:00Z", 1.0));
        h.upsert(entry("2026-01-01T00:00:00Z", 1.0));
        h.upsert(entry("2026-01-02T00:00:00Z", 1.0));
        let days: Vec<_> = h.entries.iter().map(|e| e.generated_at.to_rfc3339()).collect();
        assert!(days.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(h.transition_count(), 2);
        assert_eq!(h.transitions().count(), 2);
    }

    #[test]
    fn transition_count_of_empty_is_zero() {
        assert_eq!(BaselineHistory::new().transition_count(), 0);
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let h = load_history(&dir.path().join("history.json")).unwrap();
        assert!(h.is_empty());
    }

    #[test]
    fn unparseable_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{\"entries\": [").unwrap();
        let err = load_history(&path).unwrap_err();
        assert_eq!(err.code(), 21);
    }

    #[test]
    fn undecodable_entries_are_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{"entries": [
                {"generated_at": "2026-01-01T00:00:00Z", "window_size": 5, "success_rate": 1.0, "p95_ms": 10},
                {"generated_at": "yesterday"},
                42
            ]}"#,
        )
        .unwrap();
        let h = load_history(&path).unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut h = BaselineHistory::new();
        h.upsert(entry("2026-01-01T00:00:00Z", 1.0));
        h.upsert(entry("2026-01-02T00:00:00Z", 0.9));
        save_history(&path, &h).unwrap();
        assert_eq!(load_history(&path).unwrap(), h);
    }
}
