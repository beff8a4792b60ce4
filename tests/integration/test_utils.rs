//! Shared helpers for building document sequences and reading back TIFF
//! artifacts.

use std::fs::File;
use std::path::Path;

use serde_json::{json, Map, Value};
use tiff::decoder::{Decoder, DecodingResult};

use run_exporter::DocumentKind;

pub const RUN_UID: &str = "5f1f9b11";

// =============================================================================
// Document Builders
// =============================================================================

pub fn start_doc() -> (DocumentKind, Value) {
    (
        DocumentKind::Start,
        json!({
            "uid": RUN_UID,
            "time": 1_700_000_000.0,
            "plan_name": "count",
            "scan_id": 7
        }),
    )
}

/// A descriptor with the given `(field, dtype, shape)` declarations.
pub fn descriptor_doc(
    uid: &str,
    stream: &str,
    fields: &[(&str, &str, Value)],
) -> (DocumentKind, Value) {
    let mut data_keys = Map::new();
    for (field, dtype, shape) in fields {
        data_keys.insert(
            field.to_string(),
            json!({"dtype": dtype, "shape": shape, "source": format!("PV:{field}")}),
        );
    }

    (
        DocumentKind::Descriptor,
        json!({
            "uid": uid,
            "name": stream,
            "run_start": RUN_UID,
            "data_keys": data_keys
        }),
    )
}

/// An event carrying the given `(field, value)` payloads.
pub fn event_doc(
    descriptor: &str,
    seq_num: u64,
    fields: &[(&str, Value)],
) -> (DocumentKind, Value) {
    let mut data = Map::new();
    let mut timestamps = Map::new();
    for (field, value) in fields {
        data.insert(field.to_string(), value.clone());
        timestamps.insert(field.to_string(), json!(1_700_000_000.0 + seq_num as f64));
    }

    (
        DocumentKind::Event,
        json!({
            "descriptor": descriptor,
            "uid": format!("event-{seq_num}"),
            "seq_num": seq_num,
            "time": 1_700_000_000.0 + seq_num as f64,
            "data": data,
            "timestamps": timestamps
        }),
    )
}

pub fn stop_doc() -> (DocumentKind, Value) {
    (
        DocumentKind::Stop,
        json!({
            "uid": "stop-1",
            "time": 1_700_000_600.0,
            "run_start": RUN_UID,
            "exit_status": "success"
        }),
    )
}

/// 2D array of ones as nested JSON.
pub fn ones(rows: usize, cols: usize) -> Value {
    json!(vec![vec![1u64; cols]; rows])
}

/// 3D array filled with `value` as nested JSON.
pub fn filled3(planes: usize, rows: usize, cols: usize, value: u64) -> Value {
    json!(vec![vec![vec![value; cols]; rows]; planes])
}

/// Canonical small run: one stream "primary", one field "img"
/// declared `[10, 10]`, `events` events each carrying a 10x10 array of
/// ones.
pub fn simple_run(events: u64) -> Vec<(DocumentKind, Value)> {
    let mut documents = vec![
        start_doc(),
        descriptor_doc("desc-primary", "primary", &[("img", "array", json!([10, 10]))]),
    ];
    for seq_num in 1..=events {
        documents.push(event_doc("desc-primary", seq_num, &[("img", ones(10, 10))]));
    }
    documents.push(stop_doc());
    documents
}

// =============================================================================
// TIFF Read-Back
// =============================================================================

/// Read every page of a TIFF file as u16 pixel buffers.
pub fn read_u16_frames(path: &Path) -> Vec<Vec<u16>> {
    let file = File::open(path).unwrap_or_else(|e| panic!("open {}: {e}", path.display()));
    let mut decoder = Decoder::new(file).unwrap();

    let mut frames = Vec::new();
    loop {
        match decoder.read_image().unwrap() {
            DecodingResult::U16(pixels) => frames.push(pixels),
            other => panic!("Expected U16 pixels in {}, got {other:?}", path.display()),
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    frames
}

/// Dimensions `(width, height)` of the first page.
pub fn tiff_dimensions(path: &Path) -> (u32, u32) {
    let file = File::open(path).unwrap();
    let mut decoder = Decoder::new(file).unwrap();
    decoder.dimensions().unwrap()
}
