use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// A memory address taken from a crash report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Addr(pub u64);

impl Serialize for Addr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        format!("0x{:x}", self.0).serialize(serializer)
    }
}

/// A fully decoded crash report.
///
/// Built once per report by [`CrashReport::decode`](crate::CrashReport::decode)
/// and immutable afterwards. Fields a format revision does not carry decode to
/// `None` rather than to fabricated zero values.
#[derive(Debug, Serialize)]
pub struct CrashReport {
    /// Format revision the report was written with (1, 2 or 3).
    pub format_version: u32,
    /// Name of the fatal signal, e.g. `"SIGILL"`.
    pub signal_name: String,
    /// Address the faulting instruction touched.
    pub fault_address: Addr,
    /// When the crash happened, as recorded by the crash handler.
    pub timestamp: DateTime<Utc>,
    /// All captured threads, in capture order. Index 0 is not necessarily
    /// the crashed thread.
    pub threads: Vec<ThreadState>,
    /// Binary images loaded at crash time, keyed by base address.
    pub images: Vec<BinaryImage>,
    /// Device metrics sampled at crash time. Format >= v2 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_metrics: Option<DeviceMetrics>,
    /// Version of the crashed application. Format >= v3 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

/// The captured state of a single thread.
#[derive(Debug, Serialize)]
pub struct ThreadState {
    /// Numeric thread identifier.
    pub thread_number: u32,
    /// Whether this is the thread that took the fatal signal. A well-formed
    /// report marks exactly one thread, but the decoder tolerates zero or
    /// several.
    pub crashed: bool,
    /// Register dump, empty when the handler did not capture one.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub registers: BTreeMap<String, Addr>,
    /// Stack frames in call order.
    pub frames: Vec<StackFrame>,
}

/// A single stack frame, identified only by its instruction pointer.
///
/// Image name and offset are derived lazily against the report's image list,
/// see [`resolve`](crate::resolve).
#[derive(Debug, Serialize)]
pub struct StackFrame {
    /// Address of the instruction the thread was executing.
    pub instruction_pointer: Addr,
}

/// A binary image that was loaded when the process crashed.
#[derive(Debug, Serialize)]
pub struct BinaryImage {
    /// Start of the image's address range.
    pub base_address: Addr,
    /// Length of the range; the image covers `[base, base + size)`.
    pub size: u64,
    /// Filesystem path the image was loaded from.
    pub path: String,
    /// Identifier used to match the image against external symbol stores.
    /// Only format >= v3 records it reliably.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
}

impl BinaryImage {
    /// The display name of the image, the final component of its path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Whether the given address falls into this image's range.
    pub fn contains(&self, addr: Addr) -> bool {
        addr.0
            .checked_sub(self.base_address.0)
            .map_or(false, |offset| offset < self.size)
    }
}

/// Device metrics sampled when the crash was captured.
#[derive(Debug, Serialize)]
pub struct DeviceMetrics {
    /// Battery charge as a fraction between 0.0 and 1.0.
    pub battery_level: f64,
    /// Free disk space in bytes.
    pub free_disk_space: u64,
    /// Free memory in bytes.
    pub free_memory: u64,
}
