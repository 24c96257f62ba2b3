//! Structured logging for tg-core.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for CI log collectors
//!
//! # Usage
//!
//! ```ignore
//! use tg_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id(), "gate");
//! let _span = ctx.span().entered();
//! log_event!(ctx, INFO, event_names::GATE_DECISION, Stage::Gate, "gate evaluated");
//! ```
//!
//! stdout is reserved for command payloads; all log output goes to stderr.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Call once at startup before any logging occurs. Repeated calls are
/// ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .parse_lossy("");

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(JsonlLayer::stderr())
            .try_init(),
    };
    let _ = result;
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Structured event logging with correlation context.
///
/// `run_id` and `command` come from the enclosing `LogContext::span`; the
/// macro only adds the stage and the event's own fields.
///
/// Usage:
/// ```ignore
/// log_event!(ctx, INFO, event_names::GATE_DECISION, Stage::Gate, "gate evaluated",
///     decision = "PASS", failures = 0);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {{
        let _ctx: &$crate::logging::LogContext = &$ctx;
        tracing::info!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    }};
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {{
        let _ctx: &$crate::logging::LogContext = &$ctx;
        tracing::debug!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    }};
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {{
        let _ctx: &$crate::logging::LogContext = &$ctx;
        tracing::warn!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    }};
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {{
        let _ctx: &$crate::logging::LogContext = &$ctx;
        tracing::error!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_format() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();
        assert!(id1.starts_with("run-"));
        assert_eq!(id1.len(), 16);
        assert!(id1[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id1, id2);
    }

    #[test]
    fn init_twice_does_not_panic() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        init_logging(&config);
        init_logging(&config);
    }
}
