//! Structured usage reports.
//!
//! Field names follow the dotted document layout operators already consume,
//! e.g. `invocations.current` and `callstack.length`. Timestamps serialize as
//! ISO-8601 with millisecond precision and durations as `xs:duration`.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;
use tundra_domain::{
    PackageName, Pipeline, ServiceName, SessionId, UserName, format_timestamp, format_xml_duration,
};
use tundra_ports::SnapshotCodable;

/// Point-in-time view of the whole monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    /// Whether the monitor is currently active.
    #[serde(rename = "monitoring.started?")]
    pub started: bool,
    /// When the monitor was started.
    #[serde(
        rename = "monitoring.start",
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_timestamp"
    )]
    pub started_at: Option<DateTime<Utc>>,
    /// How long the monitor has been active.
    #[serde(
        rename = "monitoring.duration",
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_duration"
    )]
    pub uptime: Option<Duration>,
    /// When this report was generated.
    #[serde(rename = "monitoring.datetime", serialize_with = "timestamp")]
    pub generated_at: DateTime<Utc>,
    /// Calls registered since the monitor started.
    #[serde(rename = "invocations.started")]
    pub total_invocations: u64,
    /// Registered calls that returned an error or panicked.
    #[serde(rename = "invocations.errored")]
    pub total_errors: u64,
    /// In-flight invocations, oldest outermost call first.
    #[serde(rename = "invocations.current")]
    pub current: Vec<InvocationReport>,
    /// Number of entries in `current`.
    #[serde(rename = "invocations.current.length")]
    pub current_length: usize,
}

impl UsageReport {
    /// Find the invocation running on the thread with the given name.
    #[must_use]
    pub fn invocation_named(&self, thread_name: &str) -> Option<&InvocationReport> {
        self.current
            .iter()
            .find(|invocation| invocation.thread_name == thread_name)
    }
}

impl SnapshotCodable for UsageReport {
    type Snapshot = Self;
    const KIND: &'static str = "usage_report";

    fn snapshot(&self) -> Self {
        self.clone()
    }
}

/// One thread's in-flight call stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationReport {
    /// Process-unique thread number.
    #[serde(rename = "thread.id")]
    pub thread_id: u64,
    /// Thread display name.
    #[serde(rename = "thread.name")]
    pub thread_name: String,
    /// Start of the outermost call.
    #[serde(rename = "thread.start", serialize_with = "timestamp")]
    pub started_at: DateTime<Utc>,
    /// Time since the outermost call started.
    #[serde(rename = "thread.duration", serialize_with = "duration")]
    pub elapsed: Duration,
    /// Frames, innermost (most recent) call first.
    pub callstack: Vec<FrameReport>,
    /// Number of entries in `callstack`.
    #[serde(rename = "callstack.length")]
    pub callstack_length: usize,
}

impl InvocationReport {
    /// Service names on the stack, innermost first.
    #[must_use]
    pub fn services(&self) -> Vec<&str> {
        self.callstack
            .iter()
            .map(|frame| frame.service.as_str())
            .collect()
    }
}

impl SnapshotCodable for InvocationReport {
    type Snapshot = Self;
    const KIND: &'static str = "invocation_report";

    fn snapshot(&self) -> Self {
        self.clone()
    }
}

/// One in-flight service call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    /// Fully-qualified service name.
    pub service: ServiceName,
    /// Package that provides the service.
    pub package: PackageName,
    /// Input captured when the call started.
    pub pipeline: Pipeline,
    /// Top-level entry count of `pipeline`.
    #[serde(rename = "pipeline.length")]
    pub pipeline_length: usize,
    /// HTML rendering of `pipeline`, absent when rendering failed.
    #[serde(rename = "pipeline.html")]
    pub pipeline_html: Option<String>,
    /// When the call started.
    #[serde(rename = "start", serialize_with = "timestamp")]
    pub started_at: DateTime<Utc>,
    /// Time since the call started.
    #[serde(rename = "duration", serialize_with = "duration")]
    pub elapsed: Duration,
    /// Session the call runs under.
    pub session: SessionId,
    /// User the call runs as.
    pub user: UserName,
}

impl SnapshotCodable for FrameReport {
    type Snapshot = Self;
    const KIND: &'static str = "frame_report";

    fn snapshot(&self) -> Self {
        self.clone()
    }
}

fn timestamp<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*at))
}

fn optional_timestamp<S: Serializer>(
    at: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match at {
        Some(at) => timestamp(at, serializer),
        None => serializer.serialize_none(),
    }
}

fn duration<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_xml_duration(*elapsed))
}

fn optional_duration<S: Serializer>(
    elapsed: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match elapsed {
        Some(elapsed) => duration(elapsed, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }

    #[test]
    fn stopped_report_omits_start_and_duration() -> Result<(), Box<dyn std::error::Error>> {
        let report = UsageReport {
            started: false,
            started_at: None,
            uptime: None,
            generated_at: at(1_714_558_530_042),
            total_invocations: 0,
            total_errors: 0,
            current: Vec::new(),
            current_length: 0,
        };

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["monitoring.started?"], false);
        assert!(json.get("monitoring.start").is_none());
        assert!(json.get("monitoring.duration").is_none());
        assert_eq!(json["monitoring.datetime"], "2024-05-01T10:15:30.042Z");
        assert_eq!(json["invocations.current.length"], 0);
        Ok(())
    }

    #[test]
    fn frame_fields_use_dotted_names() -> Result<(), Box<dyn std::error::Error>> {
        let frame = FrameReport {
            service: ServiceName::parse("ns:foo")?,
            package: PackageName::parse("Pkg")?,
            pipeline: Pipeline::new().with("x", 1),
            pipeline_length: 1,
            pipeline_html: Some("<table></table>".to_string()),
            started_at: at(0),
            elapsed: Duration::from_millis(1_500),
            session: SessionId::parse("s-1")?,
            user: UserName::parse("Administrator")?,
        };

        let json = serde_json::to_value(&frame)?;
        assert_eq!(json["service"], "ns:foo");
        assert_eq!(json["pipeline"]["x"], 1);
        assert_eq!(json["pipeline.length"], 1);
        assert_eq!(json["duration"], "PT1.5S");
        assert_eq!(json["start"], "1970-01-01T00:00:00.000Z");
        Ok(())
    }

    #[test]
    fn reports_cannot_be_restored() {
        let mut report = InvocationReport {
            thread_id: 1,
            thread_name: "main".to_string(),
            started_at: at(0),
            elapsed: Duration::ZERO,
            callstack: Vec::new(),
            callstack_length: 0,
        };
        let snapshot = report.snapshot();

        let outcome = report.restore(&snapshot);
        assert!(outcome.is_err_and(|error| error.is_unsupported()));
    }
}
