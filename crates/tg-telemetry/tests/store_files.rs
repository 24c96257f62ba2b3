//! File-backed tests for the event log reader and the history store.

use std::fs;
use std::io::Write;

use tempfile::{tempdir, NamedTempFile};
use tg_common::EventStatus;
use tg_telemetry::{load_history, read_log, save_history, BaselineHistory, HistoryEntry};

#[test]
fn log_file_with_mixed_lines() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"timestamp":"2026-01-01T00:00:00Z","pipeline":"generate.batch.execute","status":"start"}}"#).unwrap();
    writeln!(file, r#"{{"timestamp":"2026-01-01T00:00:01Z","pipeline":"generate.batch.execute","status":"success","duration_ms":812,"metadata":{{"provider":"openai"}}}}"#).unwrap();
    writeln!(file, "garbage").unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"pipeline":"frontend.tab.switch","status":"error","metadata":{{"failureType":"timeout"}}}}"#).unwrap();
    file.flush().unwrap();

    let log = read_log(file.path()).unwrap();
    assert_eq!(log.events.len(), 3);
    assert_eq!(log.dropped_lines, 1);
    assert_eq!(log.events[1].success_duration(), Some(812.0));
    assert_eq!(log.events[1].provider(), Some("openai"));
    assert_eq!(log.events[2].status, EventStatus::Error);
    assert_eq!(log.events[2].failure_reason(), Some("timeout"));
}

#[test]
fn empty_log_file_has_no_events() {
    let file = NamedTempFile::new().unwrap();
    let log = read_log(file.path()).unwrap();
    assert!(log.events.is_empty());
    assert_eq!(log.dropped_lines, 0);
}

#[test]
fn history_read_modify_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("baseline").join("history.json");

    let mut history = load_history(&path).unwrap();
    for day in 1..=3 {
        history.upsert(HistoryEntry {
            generated_at: format!("2026-02-0{day}T12:00:00Z").parse().unwrap(),
            window_size: 200,
            success_rate: 1.0,
            p95_ms: 900.0 + f64::from(day),
            provider_fail_rate: Default::default(),
        });
    }
    save_history(&path, &history).unwrap();

    let mut reloaded = load_history(&path).unwrap();
    assert_eq!(reloaded.len(), 3);
    reloaded.upsert(reloaded.entries[1].clone());
    assert_eq!(reloaded.len(), 3);

    let text = fs::read_to_string(&path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["schema_version"], tg_common::SCHEMA_VERSION);
    assert_eq!(doc["entries"].as_array().map(Vec::len), Some(3));
}

#[test]
fn empty_history_document_is_valid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");
    fs::write(&path, "{}").unwrap();
    assert_eq!(load_history(&path).unwrap(), BaselineHistory::new());
}
