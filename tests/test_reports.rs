use std::fs;

use rum_crash_reporting::{
    CrashReporter, ExportError, FileReportStore, PendingState, SpanData, SpanExporter,
    REPORTER_SPAN_NAME,
};

struct TestSpanExporter {
    spans: Vec<SpanData>,
    export_succeeds: bool,
}

impl TestSpanExporter {
    fn new() -> Self {
        Self {
            spans: vec![],
            export_succeeds: true,
        }
    }
}

impl SpanExporter for TestSpanExporter {
    fn export(&mut self, span: SpanData) -> Result<(), ExportError> {
        if self.export_succeeds {
            self.spans.push(span);
            Ok(())
        } else {
            Err(ExportError::new("export refused"))
        }
    }
}

/// Copies a fixture into a temp dir and runs one start over it, returning
/// the emitted spans.
fn run_start(fixture: &str) -> Vec<SpanData> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.crash");
    fs::copy(format!("tests/fixtures/{fixture}"), &path).unwrap();

    let mut reporter = CrashReporter::new(FileReportStore::new(path), TestSpanExporter::new());
    reporter.start();
    reporter.into_parts().1.spans
}

fn find<'a>(spans: &'a [SpanData], name: &str) -> Option<&'a SpanData> {
    spans.iter().find(|span| span.name == name)
}

#[test]
fn test_basics_v1() {
    let spans = run_start("sample_v1.bin");

    let crash = find(&spans, "SIGILL").expect("crash span");
    assert_eq!(crash.attributes["crash.address"], "140733995048756");
    assert_eq!(crash.attributes["component"], "crash");
    assert_eq!(crash.attributes["error"], "true");
    assert_eq!(crash.attributes["exception.type"], "SIGILL");
    // v1 reports carry no device metrics or app version
    assert!(!crash.attributes.contains_key("crash.batteryLevel"));
    assert!(!crash.attributes.contains_key("crash.freeDiskSpace"));
    assert!(!crash.attributes.contains_key("crash.freeMemory"));
    assert!(!crash.attributes.contains_key("crash.app.version"));
    // the span covers the original crash time, not the time of reporting
    assert_eq!(crash.start.timestamp_millis(), 1612901820000);
    assert_eq!(crash.end, crash.start);

    let startup = find(&spans, REPORTER_SPAN_NAME).expect("startup span");
    assert_eq!(startup.attributes["component"], "appstart");
}

#[test]
fn test_basics_v2() {
    let spans = run_start("sample_v2.bin");

    let crash = find(&spans, "SIGTRAP").expect("crash span");
    assert_eq!(crash.attributes["crash.address"], "7595465412");
    assert_eq!(crash.attributes["component"], "crash");
    assert_eq!(crash.attributes["error"], "true");
    assert_eq!(crash.attributes["exception.type"], "SIGTRAP");
    assert_eq!(crash.attributes["crash.batteryLevel"], "91.0%");
    assert_eq!(crash.attributes["crash.freeDiskSpace"], "197.23 GB");
    assert_eq!(crash.attributes["crash.freeMemory"], "5.54 GB");
    assert!(!crash.attributes.contains_key("crash.app.version"));

    let startup = find(&spans, REPORTER_SPAN_NAME).expect("startup span");
    assert_eq!(startup.attributes["component"], "appstart");
}

#[test]
fn test_basics_v3() {
    let spans = run_start("sample_v3.bin");

    let crash = find(&spans, "SIGTRAP").expect("crash span");
    assert_eq!(crash.attributes["crash.address"], "6786470812");
    assert_eq!(crash.attributes["component"], "crash");
    assert_eq!(crash.attributes["error"], "true");
    assert_eq!(crash.attributes["exception.type"], "SIGTRAP");
    assert_eq!(crash.attributes["crash.batteryLevel"], "100.0%");
    assert_eq!(crash.attributes["crash.freeDiskSpace"], "628.03 GB");
    assert_eq!(crash.attributes["crash.freeMemory"], "31.88 GB");
    assert_eq!(crash.attributes["crash.app.version"], "1.0");

    let threads = &crash.attributes["exception.threads"];
    for field in [
        "threadNumber",
        "crashed",
        "instructionPointer",
        "baseAddress",
        "imageName",
        "offset",
    ] {
        assert!(threads.contains(field), "missing {field} in {threads}");
    }

    let images = &crash.attributes["exception.images"];
    for field in ["imageUUID", "imageSize", "imagePath", "baseAddress"] {
        assert!(images.contains(field), "missing {field} in {images}");
    }

    let startup = find(&spans, REPORTER_SPAN_NAME).expect("startup span");
    assert_eq!(startup.attributes["component"], "appstart");
}

#[test]
fn test_report_is_processed_at_most_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.crash");
    fs::copy("tests/fixtures/sample_v1.bin", &path).unwrap();

    let mut first = CrashReporter::new(FileReportStore::new(&path), TestSpanExporter::new());
    assert_eq!(first.start(), PendingState::Processed);
    let spans = first.into_parts().1.spans;
    assert!(find(&spans, "SIGILL").is_some());
    assert!(!path.exists(), "processed report must be removed");

    // second start over the same path sees no report
    let mut second = CrashReporter::new(FileReportStore::new(&path), TestSpanExporter::new());
    assert_eq!(second.start(), PendingState::NoPendingReport);
    let spans = second.into_parts().1.spans;
    assert!(find(&spans, "SIGILL").is_none());
    assert!(find(&spans, REPORTER_SPAN_NAME).is_some());
}

#[test]
fn test_truncated_report_emits_no_crash_span() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.crash");
    let bytes = fs::read("tests/fixtures/sample_v1.bin").unwrap();
    fs::write(&path, &bytes[..40]).unwrap();

    let mut reporter = CrashReporter::new(FileReportStore::new(&path), TestSpanExporter::new());
    assert_eq!(reporter.start(), PendingState::Processed);
    let spans = reporter.into_parts().1.spans;

    // the bad report is discarded without blocking the liveness signal
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, REPORTER_SPAN_NAME);
    assert!(!path.exists(), "undecodable report must still be removed");
}

#[test]
fn test_export_failure_does_not_block_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.crash");
    fs::copy("tests/fixtures/sample_v2.bin", &path).unwrap();

    let exporter = TestSpanExporter {
        spans: vec![],
        export_succeeds: false,
    };
    let mut reporter = CrashReporter::new(FileReportStore::new(&path), exporter);
    assert_eq!(reporter.start(), PendingState::Processed);
    assert!(!path.exists(), "report must be cleared even when export fails");
}
