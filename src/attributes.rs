//! Mapping of a decoded [`CrashReport`] onto the fixed telemetry attribute
//! schema.
//!
//! Thread and image lists are embedded as JSON strings so a single span
//! attribute can carry the whole structure. Optional data that the report
//! does not carry omits the attribute key entirely instead of emitting an
//! empty or zero value.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::report::{Addr, BinaryImage, CrashReport, ThreadState};
use crate::resolve::resolve;

#[derive(Serialize)]
struct ThreadDetails<'a> {
    #[serde(rename = "threadNumber")]
    thread_number: u32,
    crashed: bool,
    #[serde(skip_serializing_if = "registers_empty")]
    registers: &'a BTreeMap<String, Addr>,
    frames: Vec<FrameDetails<'a>>,
}

fn registers_empty(registers: &&BTreeMap<String, Addr>) -> bool {
    registers.is_empty()
}

#[derive(Serialize)]
struct FrameDetails<'a> {
    #[serde(rename = "instructionPointer")]
    instruction_pointer: Addr,
    #[serde(rename = "imageName", skip_serializing_if = "Option::is_none")]
    image_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(rename = "baseAddress", skip_serializing_if = "Option::is_none")]
    base_address: Option<Addr>,
}

#[derive(Serialize)]
struct ImageDetails<'a> {
    #[serde(rename = "baseAddress")]
    base_address: Addr,
    #[serde(rename = "imageSize")]
    image_size: u64,
    #[serde(rename = "imagePath")]
    image_path: &'a str,
    #[serde(rename = "imageUUID", skip_serializing_if = "Option::is_none")]
    image_uuid: Option<Uuid>,
}

/// Builds the span attribute mapping for a decoded crash report.
pub fn map_attributes(report: &CrashReport) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    attributes.insert("component".to_owned(), "crash".to_owned());
    attributes.insert("error".to_owned(), "true".to_owned());
    attributes.insert("exception.type".to_owned(), report.signal_name.clone());
    attributes.insert("crash.address".to_owned(), report.fault_address.0.to_string());
    attributes.insert(
        "exception.threads".to_owned(),
        serialize_threads(&report.threads, &report.images),
    );
    attributes.insert("exception.images".to_owned(), serialize_images(&report.images));

    if let Some(metrics) = &report.device_metrics {
        attributes.insert(
            "crash.batteryLevel".to_owned(),
            format_percentage(metrics.battery_level),
        );
        attributes.insert(
            "crash.freeDiskSpace".to_owned(),
            format_byte_count(metrics.free_disk_space),
        );
        attributes.insert(
            "crash.freeMemory".to_owned(),
            format_byte_count(metrics.free_memory),
        );
    }

    if let Some(version) = &report.app_version {
        attributes.insert("crash.app.version".to_owned(), version.clone());
    }

    attributes
}

fn serialize_threads(threads: &[ThreadState], images: &[BinaryImage]) -> String {
    let details: Vec<ThreadDetails<'_>> = threads
        .iter()
        .map(|thread| ThreadDetails {
            thread_number: thread.thread_number,
            crashed: thread.crashed,
            registers: &thread.registers,
            frames: thread
                .frames
                .iter()
                .map(|frame| {
                    let location = resolve(frame.instruction_pointer, images);
                    FrameDetails {
                        instruction_pointer: frame.instruction_pointer,
                        image_name: location.as_ref().map(|l| l.image_name),
                        offset: location.as_ref().map(|l| l.offset),
                        base_address: location.as_ref().map(|l| l.base_address),
                    }
                })
                .collect(),
        })
        .collect();
    serde_json::to_string(&details).expect("thread details serialize to JSON")
}

fn serialize_images(images: &[BinaryImage]) -> String {
    let details: Vec<ImageDetails<'_>> = images
        .iter()
        .map(|image| ImageDetails {
            base_address: image.base_address,
            image_size: image.size,
            image_path: &image.path,
            image_uuid: image.uuid,
        })
        .collect();
    serde_json::to_string(&details).expect("image details serialize to JSON")
}

/// Renders a 0.0–1.0 fraction as a percentage with one decimal place.
fn format_percentage(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Renders a byte count scaled to the largest decimal unit where the value
/// stays at or above one, with two decimal places.
fn format_byte_count(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
