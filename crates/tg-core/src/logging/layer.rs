//! Tracing layer for JSONL output.
//!
//! Writes one JSON object per event to stderr so that stdout stays reserved
//! for gate reports.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

/// Correlation fields captured from a span.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    command: Option<String>,
}

impl SpanContext {
    fn fill_from(&mut self, other: &SpanContext) {
        if self.run_id.is_none() {
            self.run_id.clone_from(&other.run_id);
        }
        if self.command.is_none() {
            self.command.clone_from(&other.command);
        }
    }
}

impl Visit for SpanContext {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_text(field, format!("{:?}", value));
    }
}

impl SpanContext {
    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "run_id" => self.run_id = Some(value),
            "command" => self.command = Some(value),
            _ => {}
        }
    }
}

/// Extracts the message and remaining fields of an event.
#[derive(Default)]
struct JsonFieldVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
}

impl Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.fields.insert(field.name().to_string(), Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields.insert(field.name().to_string(), Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::Bool(value));
    }
}

/// JSONL tracing layer.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut span_ctx = SpanContext::default();
        attrs.record(&mut span_ctx);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(span_ctx);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut correlation = SpanContext::default();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    correlation.fill_from(span_ctx);
                }
            }
        }

        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);

        let level: Level = (*event.metadata().level()).into();
        let mut obj = Map::new();
        obj.insert("ts".to_string(), json!(Utc::now().to_rfc3339()));
        obj.insert("level".to_string(), json!(level));
        obj.insert("event".to_string(), json!(event.metadata().target()));
        if let Some(id) = correlation.run_id {
            obj.insert("run_id".to_string(), json!(id));
        }
        if let Some(cmd) = correlation.command {
            obj.insert("command".to_string(), json!(cmd));
        }
        // The stage is an event field but sits next to the correlation ids.
        if let Some(stage) = visitor.fields.remove("stage") {
            obj.insert("stage".to_string(), stage);
        }
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), json!(msg));
        }
        if !visitor.fields.is_empty() {
            obj.insert("fields".to_string(), Value::Object(visitor.fields));
        }

        let line = serde_json::to_string(&Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}
