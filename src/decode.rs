//! Decoding of the on-disk binary crash report format.
//!
//! The crash handler writes a single self-contained buffer before the
//! process dies. All integers are little-endian, strings carry a `u16`
//! length prefix followed by UTF-8 bytes:
//!
//! ```text
//! magic            [u8; 4] = "CRPT"
//! version          u16       (1, 2 or 3)
//! timestamp_ms     u64       unix epoch milliseconds of the crash
//! signal           string
//! fault_address    u64
//! thread_count     u32
//!   thread_number  u32
//!   crashed        u8
//!   register_count u16       (name string + u64 value each)
//!   frame_count    u32       (u64 instruction pointer each)
//! image_count      u32
//!   base_address   u64
//!   size           u64
//!   path           string
//!   uuid           [u8; 16]  v3 only
//! metrics_flag     u8        v2 and later; if 1: battery f64,
//!                            free_disk u64, free_memory u64
//! appver_flag      u8        v3 only; if 1: app version string
//! ```
//!
//! Revisions are strictly additive: v2 introduced the device metrics
//! block, v3 added image uuids and the application version. Fields a
//! revision does not carry decode to `None`. Trailing bytes after the
//! last section are ignored.

use std::collections::BTreeMap;

use chrono::DateTime;
use scroll::{Pread, LE};

use crate::error::{ReportError, ReportErrorKind};
use crate::report::{Addr, BinaryImage, CrashReport, DeviceMetrics, StackFrame, ThreadState};

const MAGIC: &[u8; 4] = b"CRPT";

/// Smallest possible encoding of one thread record.
const MIN_THREAD_SIZE: usize = 4 + 1 + 2 + 4;
/// Smallest possible encoding of one image record (v1/v2 layout).
const MIN_IMAGE_SIZE: usize = 8 + 8 + 2;

fn read_string(data: &[u8], offset: &mut usize) -> Result<String, ReportError> {
    let len = data.gread_with::<u16>(offset, LE)? as usize;
    let bytes = data.gread_with::<&[u8]>(offset, len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Rejects a section count that claims more records than the remaining
/// buffer could possibly hold, before any allocation happens.
fn check_count(count: usize, min_record_size: usize, data: &[u8], offset: usize) -> Result<(), ReportError> {
    let remaining = data.len().saturating_sub(offset);
    if count > remaining / min_record_size {
        return Err(ReportErrorKind::Truncated.into());
    }
    Ok(())
}

impl CrashReport {
    /// Decodes a stored crash report buffer.
    ///
    /// The embedded version marker selects the field layout; unsupported
    /// markers and unrecognized signatures fail with
    /// [`ReportErrorKind::Malformed`], sections running past the end of the
    /// buffer with [`ReportErrorKind::Truncated`]. Optional sections that
    /// are simply absent never fail.
    pub fn decode(data: &[u8]) -> Result<CrashReport, ReportError> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(ReportError::new(
                ReportErrorKind::Malformed,
                "missing report signature",
            ));
        }

        let mut offset = MAGIC.len();
        let version = data.gread_with::<u16>(&mut offset, LE)?;
        if !(1..=3).contains(&version) {
            return Err(ReportError::new(
                ReportErrorKind::Malformed,
                format!("unsupported report version {version}"),
            ));
        }

        let timestamp_ms = data.gread_with::<u64>(&mut offset, LE)?;
        let timestamp = DateTime::from_timestamp_millis(timestamp_ms as i64).ok_or_else(|| {
            ReportError::new(
                ReportErrorKind::Malformed,
                format!("crash timestamp {timestamp_ms} out of range"),
            )
        })?;

        let signal_name = read_string(data, &mut offset)?;
        let fault_address = Addr(data.gread_with::<u64>(&mut offset, LE)?);

        let thread_count = data.gread_with::<u32>(&mut offset, LE)? as usize;
        check_count(thread_count, MIN_THREAD_SIZE, data, offset)?;
        let mut threads = Vec::with_capacity(thread_count);
        for _ in 0..thread_count {
            threads.push(read_thread(data, &mut offset)?);
        }

        let image_count = data.gread_with::<u32>(&mut offset, LE)? as usize;
        check_count(image_count, MIN_IMAGE_SIZE, data, offset)?;
        let mut images = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            images.push(read_image(data, &mut offset, version)?);
        }

        let device_metrics = if version >= 2 {
            read_device_metrics(data, &mut offset)?
        } else {
            None
        };

        let app_version = if version >= 3 {
            let flag = data.gread_with::<u8>(&mut offset, LE)?;
            if flag != 0 {
                Some(read_string(data, &mut offset)?)
            } else {
                None
            }
        } else {
            None
        };

        Ok(CrashReport {
            format_version: version.into(),
            signal_name,
            fault_address,
            timestamp,
            threads,
            images,
            device_metrics,
            app_version,
        })
    }
}

fn read_thread(data: &[u8], offset: &mut usize) -> Result<ThreadState, ReportError> {
    let thread_number = data.gread_with::<u32>(offset, LE)?;
    let crashed = data.gread_with::<u8>(offset, LE)? != 0;

    let register_count = data.gread_with::<u16>(offset, LE)?;
    let mut registers = BTreeMap::new();
    for _ in 0..register_count {
        let name = read_string(data, offset)?;
        let value = Addr(data.gread_with::<u64>(offset, LE)?);
        registers.insert(name, value);
    }

    let frame_count = data.gread_with::<u32>(offset, LE)? as usize;
    check_count(frame_count, 8, data, *offset)?;
    let mut frames = Vec::with_capacity(frame_count);
    for _ in 0..frame_count {
        frames.push(StackFrame {
            instruction_pointer: Addr(data.gread_with::<u64>(offset, LE)?),
        });
    }

    Ok(ThreadState {
        thread_number,
        crashed,
        registers,
        frames,
    })
}

fn read_image(data: &[u8], offset: &mut usize, version: u16) -> Result<BinaryImage, ReportError> {
    let base_address = Addr(data.gread_with::<u64>(offset, LE)?);
    let size = data.gread_with::<u64>(offset, LE)?;
    let path = read_string(data, offset)?;

    // Only v3 reports record image uuids.
    let uuid = if version >= 3 {
        let bytes = data.gread_with::<&[u8]>(offset, 16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Some(uuid::Uuid::from_bytes(raw))
    } else {
        None
    };

    Ok(BinaryImage {
        base_address,
        size,
        path,
        uuid,
    })
}

fn read_device_metrics(data: &[u8], offset: &mut usize) -> Result<Option<DeviceMetrics>, ReportError> {
    let flag = data.gread_with::<u8>(offset, LE)?;
    if flag == 0 {
        return Ok(None);
    }
    Ok(Some(DeviceMetrics {
        battery_level: data.gread_with::<f64>(offset, LE)?,
        free_disk_space: data.gread_with::<u64>(offset, LE)?,
        free_memory: data.gread_with::<u64>(offset, LE)?,
    }))
}
