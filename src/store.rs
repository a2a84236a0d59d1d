use std::fs;
use std::io;
use std::path::PathBuf;

/// Durable storage holding at most one crash report from a previous run.
///
/// The crash handler writes the report before the process dies; on the next
/// start the reporter reads it through this interface and clears it so a
/// later start never sees the same report again.
pub trait ReportStore {
    /// Returns the bytes of a report left over from a previous run, if any.
    fn pending_report(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Removes the stored report. Removing an already absent report is not
    /// an error.
    fn clear(&mut self) -> io::Result<()>;
}

/// A [`ReportStore`] over a single well-known file path.
#[derive(Debug)]
pub struct FileReportStore {
    path: PathBuf,
}

impl FileReportStore {
    /// Creates a store reading and clearing the report at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportStore for FileReportStore {
    fn pending_report(&mut self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn clear(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
