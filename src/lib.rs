//! Turns binary crash reports left behind by a crashed process into
//! telemetry spans.
//!
//! An in-process crash handler (out of scope here) writes a self-contained
//! binary report to durable storage before the process dies. On the next
//! start, [`CrashReporter::start`] detects the pending report, decodes it
//! with [`CrashReport::decode`], maps it onto a fixed attribute schema and
//! hands one finished span per crash to a [`SpanExporter`], timestamped
//! with the original crash time. The report is then cleared so it is
//! processed at most once. A short-lived startup span tagged
//! `component="appstart"` is emitted on every start as a liveness signal.
#![warn(missing_docs)]

mod attributes;
mod decode;
mod error;
mod report;
mod resolve;
mod reporter;
mod span;
mod store;

pub use crate::attributes::map_attributes;
pub use crate::error::{ExportError, ReportError, ReportErrorKind};
pub use crate::report::{Addr, BinaryImage, CrashReport, DeviceMetrics, StackFrame, ThreadState};
pub use crate::reporter::{CrashReporter, PendingState};
pub use crate::resolve::{resolve, ResolvedLocation};
pub use crate::span::{SpanData, SpanExporter, REPORTER_SPAN_NAME};
pub use crate::store::{FileReportStore, ReportStore};
