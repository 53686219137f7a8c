//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem with a single level threshold
//! - Render every `tracing` event as one JSON object per line
//! - Enrich records with the ambient request context when there is one
//!
//! # Design Decisions
//! - Uses the tracing crate; `JsonLogFormat` plugs into the fmt layer
//! - A missing context yields a bare record, never an error
//! - Write failures are dropped by the fmt layer and never reach handlers

use std::collections::BTreeMap;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;
use crate::observability::context::CorrelationContext;

/// Keys owned by [`LogRecord`]; event fields with these names are
/// written under a `field.` prefix instead.
pub const RESERVED_KEYS: &[&str] = &[
    "timestamp",
    "level",
    "message",
    "request_id",
    "method",
    "path",
    "remote_address",
];

/// One structured log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: &'static str,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,

    /// Extra structured fields attached to the event.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl LogRecord {
    /// Build a record stamped with the current time, enriched from the
    /// ambient context when one is installed.
    pub fn capture(level: &tracing::Level, message: impl Into<String>) -> Self {
        let mut record = Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level.as_str(),
            message: message.into(),
            request_id: None,
            method: None,
            path: None,
            remote_address: None,
            fields: BTreeMap::new(),
        };

        CorrelationContext::with_current(|ctx| {
            record.request_id = Some(ctx.id().to_string());
            record.method = Some(ctx.method().to_string());
            record.path = Some(ctx.path().to_string());
            record.remote_address = ctx.remote_addr().map(|addr| addr.to_string());
        });

        record
    }

    /// Whether the record carries request context.
    pub fn is_enriched(&self) -> bool {
        self.request_id.is_some()
    }
}

/// Event formatter producing one JSON [`LogRecord`] per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLogFormat;

impl<S, N> FormatEvent<S, N> for JsonLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::capture(event.metadata().level(), visitor.message);
        record.fields = visitor.fields;

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Collects the `message` field and any extra fields of an event.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field_key(field.name()), value);
        }
    }
}

fn field_key(name: &str) -> String {
    if RESERVED_KEYS.contains(&name) {
        format!("field.{name}")
    } else {
        name.to_string()
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

/// The JSON fmt layer writing to `make_writer`.
pub fn json_layer<S, W>(make_writer: W) -> tracing_subscriber::fmt::Layer<S, DefaultFields, JsonLogFormat, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .event_format(JsonLogFormat)
        .with_writer(make_writer)
}

/// Filter admitting events at or above `level`.
pub fn level_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from(level).into())
}

/// Install the process-wide subscriber writing JSON lines to stdout.
pub fn init(level: LogLevel) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(level_filter(level))
        .with(json_layer(std::io::stdout))
        .try_init()
}
