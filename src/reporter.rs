use tracing::{debug, warn};

use crate::report::CrashReport;
use crate::span::{crash_span, startup_span, SpanExporter};
use crate::store::ReportStore;

/// Where the pending-report gate ended up after a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// The store held no report from a previous run.
    NoPendingReport,
    /// A stored report was found but not yet consumed.
    ReportFound,
    /// A stored report was consumed and removed from the store, whether or
    /// not a span came out of it.
    Processed,
}

/// Converts a crash report left pending by a previous run into telemetry
/// spans on process start.
///
/// The reporter owns its storage and exporter collaborators; there is no
/// global registration step.
pub struct CrashReporter<S, E> {
    store: S,
    exporter: E,
}

impl<S: ReportStore, E: SpanExporter> CrashReporter<S, E> {
    /// Creates a reporter over the given report store and span exporter.
    pub fn new(store: S, exporter: E) -> Self {
        Self { store, exporter }
    }

    /// Consumes the reporter and returns its store and exporter.
    pub fn into_parts(self) -> (S, E) {
        (self.store, self.exporter)
    }

    /// Runs the start sequence.
    ///
    /// If the store holds a report from a previous run it is decoded,
    /// mapped and emitted synchronously, then removed from the store. A
    /// report is consumed at most once: decode and export failures are
    /// logged, the file is still cleared, and nothing is retried against
    /// it. The startup span is emitted afterwards on every start, even when
    /// the pending report could not be processed.
    pub fn start(&mut self) -> PendingState {
        let state = self.process_pending();

        if let Err(error) = self.exporter.export(startup_span()) {
            warn!(%error, "failed to export startup span");
        }

        state
    }

    fn process_pending(&mut self) -> PendingState {
        let bytes = match self.store.pending_report() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return PendingState::NoPendingReport,
            Err(error) => {
                warn!(%error, "could not check for a pending crash report");
                return PendingState::NoPendingReport;
            }
        };

        match CrashReport::decode(&bytes) {
            Ok(report) => {
                debug!(
                    signal = %report.signal_name,
                    version = report.format_version,
                    "processing pending crash report"
                );
                // hand off before clearing, so a kill mid-emit does not
                // lose the report
                if let Err(error) = self.exporter.export(crash_span(&report)) {
                    warn!(%error, "failed to export crash span");
                }
            }
            Err(error) => {
                warn!(%error, "discarding undecodable crash report");
            }
        }

        // consumed either way; the same report is never reprocessed
        if let Err(error) = self.store.clear() {
            warn!(%error, "failed to remove processed crash report");
        }

        PendingState::Processed
    }
}
