//! Event log reader.
//!
//! The log is newline-delimited JSON, one event record per line, appended by
//! upstream pipelines. Empty lines are skipped. Lines that are not a JSON
//! object or lack a recognizable `status` are dropped without aborting the
//! read. Records are returned in file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tg_common::{event_names, parse_or_default, Error, EventRecord, Result};

/// Result of reading an event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    /// Decoded records, in file order.
    pub events: Vec<EventRecord>,
    /// Non-empty lines that did not decode.
    pub dropped_lines: usize,
}

/// Read an event log from a file path.
pub fn read_log(path: &Path) -> Result<EventLog> {
    let file = File::open(path).map_err(|source| Error::LogUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let log = read_events_from(BufReader::new(file)).map_err(|err| match err {
        Error::Io(source) => Error::LogUnreadable {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    tracing::info!(
        target: event_names::LOG_READ,
        path = %path.display(),
        events = log.events.len(),
        dropped_lines = log.dropped_lines,
        "event log read"
    );
    Ok(log)
}

/// Read only the decoded records from a file path.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    read_log(path).map(|log| log.events)
}

/// Read an event log from any buffered reader.
///
/// Lines are split on `\n`; invalid UTF-8 is replaced rather than treated as
/// an I/O failure, so a corrupt byte only costs the line it appears on.
pub fn read_events_from<R: BufRead>(mut reader: R) -> Result<EventLog> {
    let mut log = EventLog::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_or_default::<Option<EventRecord>>(line, None) {
            Some(record) => log.events.push(record),
            None => log.dropped_lines += 1,
        }
    }
    if log.dropped_lines > 0 {
        tracing::debug!(
            target: event_names::LOG_LINES_DROPPED,
            dropped = log.dropped_lines,
            "skipped malformed event log lines"
        );
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tg_common::EventStatus;

    #[test]
    fn reads_records_in_file_order() {
        let input = concat!(
            r#"{"pipeline":"a","status":"start"}"#,
            "\n",
            r#"{"pipeline":"a","status":"success","duration_ms":120}"#,
            "\n",
            r#"{"pipeline":"b","status":"error","metadata":{"provider":"fal"}}"#,
            "\n",
        );
        let log = read_events_from(Cursor::new(input)).unwrap();
        assert_eq!(log.dropped_lines, 0);
        let statuses: Vec<_> = log.events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![EventStatus::Start, EventStatus::Success, EventStatus::Error]
        );
        assert_eq!(log.events[2].provider(), Some("fal"));
    }

    #[test]
    fn malformed_lines_are_dropped_not_fatal() {
        let input = concat!(
            "not json\n",
            "\n",
            "   \n",
            r#"{"pipeline":"a"}"#,
            "\n",
            r#"{"status":"exploded"}"#,
            "\n",
            "[1,2,3]\n",
            r#"{"status":"success","duration_ms":5}"#,
            "\n",
            r#"{"status":"error""#,
        );
        let log = read_events_from(Cursor::new(input)).unwrap();
        assert_eq!(log.events.len(), 1);
        assert_eq!(log.dropped_lines, 5);
    }

    #[test]
    fn final_line_without_newline_is_read() {
        let log = read_events_from(Cursor::new(r#"{"status":"success"}"#)).unwrap();
        assert_eq!(log.events.len(), 1);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let input = "{\"status\":\"success\"}\r\n{\"status\":\"error\"}\r\n";
        let log = read_events_from(Cursor::new(input)).unwrap();
        assert_eq!(log.events.len(), 2);
    }

    #[test]
    fn invalid_utf8_only_costs_its_line() {
        let mut input = b"{\"status\":\"success\"}\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"{\"status\":\"error\"}\n");
        let log = read_events_from(Cursor::new(input)).unwrap();
        assert_eq!(log.events.len(), 2);
        assert_eq!(log.dropped_lines, 1);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = read_log(Path::new("/definitely/not/here.jsonl")).unwrap_err();
        assert_eq!(err.code(), 20);
    }
}
