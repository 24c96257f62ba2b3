//! Event records emitted by upstream pipeline executions.
//!
//! Each line of the append-only event log is one [`EventRecord`]. Decoding
//! is lenient field-by-field: only a missing or unknown `status` makes a
//! record undecodable. Every other field degrades to "absent" when it has
//! an unexpected shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Pipelines whose name starts with this prefix use the frontend threshold triple.
pub const FRONTEND_PREFIX: &str = "frontend.";

/// Metadata key carrying the external provider name.
pub const PROVIDER_KEY: &str = "provider";

/// Metadata keys carrying free-text failure diagnostics, in lookup order.
pub const FAILURE_REASON_KEYS: &[&str] = &["failureType", "reason"];

/// Whether a pipeline name belongs to the frontend scope.
pub fn is_frontend_pipeline(name: &str) -> bool {
    name.starts_with(FRONTEND_PREFIX)
}

/// Lifecycle status of one pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Execution began. Never counts as an attempt.
    Start,
    /// Execution completed successfully.
    Success,
    /// Execution failed.
    Error,
}

impl EventStatus {
    /// Only `success` and `error` are completed attempts.
    pub fn is_attempt(self) -> bool {
        matches!(self, EventStatus::Success | EventStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Start => "start",
            EventStatus::Success => "success",
            EventStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metadata value.
///
/// The metadata bag is open-ended upstream; this core only ever reads
/// string values out of it, so nested arrays and objects are kept as their
/// JSON text rather than modelled structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl MetadataValue {
    /// The value as a non-empty string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => MetadataValue::Null,
            serde_json::Value::Bool(b) => MetadataValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(MetadataValue::Number)
                .unwrap_or(MetadataValue::Null),
            serde_json::Value::String(s) => MetadataValue::String(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                MetadataValue::String(nested.to_string())
            }
        }
    }
}

impl From<MetadataValue> for serde_json::Value {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Null => serde_json::Value::Null,
            MetadataValue::Bool(b) => serde_json::Value::Bool(b),
            MetadataValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            MetadataValue::String(s) => serde_json::Value::String(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

/// One observation written by an upstream pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEventRecord")]
pub struct EventRecord {
    /// ISO-8601 instant, kept as written.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,

    /// Pipeline identifier, e.g. `generate.batch.execute`.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pipeline: Option<String>,

    pub status: EventStatus,

    /// Wall-clock duration; meaningful on `success` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// Wire shape of a record. `duration_ms` and `durationMs` are separate keys
/// so a line carrying both still decodes; the snake-case value wins.
#[derive(Deserialize)]
struct RawEventRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pipeline: Option<String>,
    status: EventStatus,
    #[serde(default, deserialize_with = "lenient_duration")]
    duration_ms: Option<f64>,
    #[serde(default, rename = "durationMs", deserialize_with = "lenient_duration")]
    duration_ms_camel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metadata")]
    metadata: BTreeMap<String, MetadataValue>,
}

impl From<RawEventRecord> for EventRecord {
    fn from(raw: RawEventRecord) -> Self {
        EventRecord {
            timestamp: raw.timestamp,
            pipeline: raw.pipeline,
            status: raw.status,
            duration_ms: raw.duration_ms.or(raw.duration_ms_camel),
            metadata: raw.metadata,
        }
    }
}

impl EventRecord {
    /// Create a bare record with the given status.
    pub fn new(status: EventStatus) -> Self {
        EventRecord {
            timestamp: None,
            pipeline: None,
            status,
            duration_ms: None,
            metadata: BTreeMap::new(),
        }
    }

    /// A `start` record for a pipeline.
    pub fn start(pipeline: impl Into<String>) -> Self {
        Self::new(EventStatus::Start).with_pipeline(pipeline)
    }

    /// A `success` record for a pipeline with a duration.
    pub fn success(pipeline: impl Into<String>, duration_ms: f64) -> Self {
        let mut record = Self::new(EventStatus::Success).with_pipeline(pipeline);
        record.duration_ms = Some(duration_ms);
        record
    }

    /// An `error` record for a pipeline.
    pub fn error(pipeline: impl Into<String>) -> Self {
        Self::new(EventStatus::Error).with_pipeline(pipeline)
    }

    pub fn with_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn with_provider(self, provider: impl Into<String>) -> Self {
        self.with_metadata(PROVIDER_KEY, MetadataValue::String(provider.into()))
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this record is a completed attempt (`success` or `error`).
    pub fn is_attempt(&self) -> bool {
        self.status.is_attempt()
    }

    /// The pipeline name, if present and non-empty.
    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }

    /// The provider carried in `metadata.provider`, if it is a non-empty string.
    pub fn provider(&self) -> Option<&str> {
        self.metadata_str(PROVIDER_KEY)
    }

    /// A string metadata value, if present and non-empty.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetadataValue::as_str)
    }

    /// Free-text failure diagnostic. Never used for gating.
    pub fn failure_reason(&self) -> Option<&str> {
        FAILURE_REASON_KEYS
            .iter()
            .find_map(|key| self.metadata_str(key))
    }

    /// Duration usable for latency percentiles: success records only.
    pub fn success_duration(&self) -> Option<f64> {
        match self.status {
            EventStatus::Success => self.duration_ms,
            _ => None,
        }
    }

    /// Parse the timestamp as an RFC 3339 instant.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|ms| ms.is_finite() && *ms >= 0.0))
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<BTreeMap<String, MetadataValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, MetadataValue::from(v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> Option<EventRecord> {
        serde_json::from_str(line).ok()
    }

    #[test]
    fn decodes_full_record() {
        let rec = decode(
            r#"{"timestamp":"2026-01-15T14:30:22Z","pipeline":"generate.batch.execute","status":"success","duration_ms":1250,"metadata":{"provider":"fal","attempt":2}}"#,
        )
        .unwrap();
        assert_eq!(rec.pipeline(), Some("generate.batch.execute"));
        assert_eq!(rec.status, EventStatus::Success);
        assert_eq!(rec.duration_ms, Some(1250.0));
        assert_eq!(rec.provider(), Some("fal"));
        assert_eq!(rec.metadata["attempt"], MetadataValue::Number(2.0));
        assert!(rec.timestamp_utc().is_some());
    }

    #[test]
    fn missing_status_is_undecodable() {
        assert!(decode(r#"{"pipeline":"a","duration_ms":5}"#).is_none());
    }

    #[test]
    fn unknown_status_is_undecodable() {
        assert!(decode(r#"{"pipeline":"a","status":"cancelled"}"#).is_none());
    }

    #[test]
    fn non_numeric_duration_degrades_to_absent() {
        let rec = decode(r#"{"status":"success","duration_ms":"fast"}"#).unwrap();
        assert_eq!(rec.duration_ms, None);
        let rec = decode(r#"{"status":"success","duration_ms":-3}"#).unwrap();
        assert_eq!(rec.duration_ms, None);
    }

    #[test]
    fn camel_case_duration_alias() {
        let rec = decode(r#"{"status":"success","durationMs":40}"#).unwrap();
        assert_eq!(rec.duration_ms, Some(40.0));
    }

    #[test]
    fn both_duration_spellings_decode() {
        let rec = decode(r#"{"status":"success","duration_ms":25,"durationMs":40}"#).unwrap();
        assert_eq!(rec.duration_ms, Some(25.0));
        let rec = decode(r#"{"status":"success","duration_ms":"n/a","durationMs":40}"#).unwrap();
        assert_eq!(rec.duration_ms, Some(40.0));
    }

    #[test]
    fn serializes_snake_case_duration() {
        let json = serde_json::to_string(&EventRecord::success("p", 12.0)).unwrap();
        assert!(json.contains(r#""duration_ms":12.0"#));
        assert!(!json.contains("durationMs"));
    }

    #[test]
    fn non_string_pipeline_degrades_to_absent() {
        let rec = decode(r#"{"status":"error","pipeline":17}"#).unwrap();
        assert_eq!(rec.pipeline(), None);
        let rec = decode(r#"{"status":"error","pipeline":"  "}"#).unwrap();
        assert_eq!(rec.pipeline(), None);
    }

    #[test]
    fn non_object_metadata_degrades_to_empty() {
        let rec = decode(r#"{"status":"error","metadata":"oops"}"#).unwrap();
        assert!(rec.metadata.is_empty());
        assert_eq!(rec.provider(), None);
    }

    #[test]
    fn nested_metadata_kept_as_json_text() {
        let rec = decode(r#"{"status":"error","metadata":{"tags":["a","b"]}}"#).unwrap();
        assert_eq!(
            rec.metadata["tags"],
            MetadataValue::String(r#"["a","b"]"#.to_string())
        );
    }

    #[test]
    fn non_string_provider_is_ignored() {
        let rec = decode(r#"{"status":"error","metadata":{"provider":42}}"#).unwrap();
        assert_eq!(rec.provider(), None);
    }

    #[test]
    fn failure_reason_prefers_failure_type() {
        let rec = EventRecord::error("p")
            .with_metadata("reason", "timeout".into())
            .with_metadata("failureType", "rate_limited".into());
        assert_eq!(rec.failure_reason(), Some("rate_limited"));
    }

    #[test]
    fn success_duration_only_for_success() {
        let mut err = EventRecord::error("p");
        err.duration_ms = Some(10.0);
        assert_eq!(err.success_duration(), None);
        assert_eq!(EventRecord::success("p", 10.0).success_duration(), Some(10.0));
    }

    #[test]
    fn attempts_exclude_start() {
        assert!(!EventStatus::Start.is_attempt());
        assert!(EventStatus::Success.is_attempt());
        assert!(EventStatus::Error.is_attempt());
    }

    #[test]
    fn frontend_prefix() {
        assert!(is_frontend_pipeline("frontend.tab.switch"));
        assert!(!is_frontend_pipeline("generate.batch.execute"));
        assert!(!is_frontend_pipeline("frontend"));
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let json = serde_json::to_string(&EventRecord::error("p")).unwrap();
        assert_eq!(json, r#"{"pipeline":"p","status":"error"}"#);
    }
}
