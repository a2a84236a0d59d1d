use std::error::Error;
use std::fmt;

use thiserror::Error;

/// The kind of a [`ReportError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportErrorKind {
    /// The buffer does not start with a recognized report signature, or a
    /// mandatory field holds a value no supported revision can produce.
    Malformed,
    /// A length-prefixed section claims more bytes than remain in the buffer.
    Truncated,
}

impl fmt::Display for ReportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed crash report"),
            Self::Truncated => write!(f, "truncated crash report"),
        }
    }
}

/// An error returned when decoding a stored crash report.
///
/// Decoding fails only on structural corruption that prevents locating the
/// mandatory signal, thread and image sections. Absent *optional* sections
/// (device metrics, app version, register dumps) are valid states, not
/// errors.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ReportError {
    kind: ReportErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ReportError {
    /// Creates a new error of a known kind with an arbitrary payload.
    pub(crate) fn new<E>(kind: ReportErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let source = Some(source.into());
        Self { kind, source }
    }

    /// Returns the corresponding [`ReportErrorKind`] for this error.
    pub fn kind(&self) -> ReportErrorKind {
        self.kind
    }
}

impl From<ReportErrorKind> for ReportError {
    fn from(kind: ReportErrorKind) -> Self {
        Self { kind, source: None }
    }
}

impl From<scroll::Error> for ReportError {
    fn from(source: scroll::Error) -> Self {
        Self::new(ReportErrorKind::Truncated, source)
    }
}

/// An error reported by a [`SpanExporter`](crate::SpanExporter) when a span
/// could not be handed off to the telemetry pipeline.
#[derive(Debug, Error)]
#[error("span export failed: {message}")]
pub struct ExportError {
    message: String,
}

impl ExportError {
    /// Creates a new export error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
