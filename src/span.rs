use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::attributes::map_attributes;
use crate::error::ExportError;
use crate::report::CrashReport;

/// Name of the startup span emitted on every process start.
pub const REPORTER_SPAN_NAME: &str = "RumCrashReporting";

/// A finished span ready for hand-off to the telemetry pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanData {
    /// Span name; for crash spans this is the signal name.
    pub name: String,
    /// Start of the span's time range.
    pub start: DateTime<Utc>,
    /// End of the span's time range.
    pub end: DateTime<Utc>,
    /// Flat attribute mapping.
    pub attributes: BTreeMap<String, String>,
}

/// The seam towards the external batching/export pipeline.
///
/// Implementations own all transport concerns (batching, retries,
/// timeouts). The reporter holds its exporter by value, there is no
/// process-wide registry to install one into.
pub trait SpanExporter {
    /// Hands a finished span to the pipeline.
    fn export(&mut self, span: SpanData) -> Result<(), ExportError>;
}

/// Builds the crash span for a decoded report. The time range is the
/// original crash time, not the time of reporting.
pub(crate) fn crash_span(report: &CrashReport) -> SpanData {
    SpanData {
        name: report.signal_name.clone(),
        start: report.timestamp,
        end: report.timestamp,
        attributes: map_attributes(report),
    }
}

/// Builds the short-lived liveness span marking that the reporting
/// subsystem initialized.
pub(crate) fn startup_span() -> SpanData {
    let now = Utc::now();
    let mut attributes = BTreeMap::new();
    attributes.insert("component".to_owned(), "appstart".to_owned());
    SpanData {
        name: REPORTER_SPAN_NAME.to_owned(),
        start: now,
        end: now,
        attributes,
    }
}
