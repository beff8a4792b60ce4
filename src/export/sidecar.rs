//! Run metadata sidecar.
//!
//! Alongside the TIFF artifacts, each run produces one
//! `<prefix>meta.json` holding the boundary documents, a descriptor
//! snapshot per stream, and the per-stream event bookkeeping (sequence
//! numbers, uids, event times, and per-field hardware timestamps):
//!
//! ```json
//! {
//!   "metadata": {
//!     "start": {...},
//!     "stop": {...},
//!     "descriptors": {"primary": {...}}
//!   },
//!   "streams": {
//!     "primary": {
//!       "seq_num": [1, 2],
//!       "uid": ["e1", "e2"],
//!       "time": [10.0, 11.0],
//!       "timestamps": {"img": [10.0, 11.0]}
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::document::{EventPage, RunStart, RunStop, StreamDescriptor};

/// Per-stream event bookkeeping accumulated across the run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StreamRecord {
    /// Sequence numbers in arrival order
    pub seq_num: Vec<u64>,

    /// Event uids in arrival order
    pub uid: Vec<String>,

    /// Event times in arrival order
    pub time: Vec<f64>,

    /// Hardware timestamps per field, one entry per event
    pub timestamps: BTreeMap<String, Vec<f64>>,
}

/// Accumulator for the JSON metadata sidecar.
#[derive(Debug, Default)]
pub struct RunSidecar {
    start: Option<RunStart>,
    stop: Option<RunStop>,
    descriptors: BTreeMap<String, StreamDescriptor>,
    streams: BTreeMap<String, StreamRecord>,
}

impl RunSidecar {
    /// Record the start document.
    pub fn set_start(&mut self, doc: RunStart) {
        self.start = Some(doc);
    }

    /// Record the stop document.
    pub fn set_stop(&mut self, doc: RunStop) {
        self.stop = Some(doc);
    }

    /// Snapshot a descriptor under its stream name and make sure the
    /// stream's record exists. A later descriptor for the same stream
    /// replaces the snapshot.
    pub fn record_descriptor(&mut self, doc: &StreamDescriptor) {
        self.descriptors.insert(doc.name.clone(), doc.clone());
        self.streams.entry(doc.name.clone()).or_default();
    }

    /// Accumulate one event page's bookkeeping under `stream`.
    pub fn record_page(&mut self, stream: &str, page: &EventPage) {
        let record = self.streams.entry(stream.to_string()).or_default();
        record.seq_num.extend_from_slice(&page.seq_num);
        record.uid.extend_from_slice(&page.uid);
        record.time.extend_from_slice(&page.time);
        for (field, timestamps) in &page.timestamps {
            record
                .timestamps
                .entry(field.clone())
                .or_default()
                .extend_from_slice(timestamps);
        }
    }

    /// Serialize the sidecar to its JSON document.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        #[derive(Serialize)]
        struct Metadata<'a> {
            start: &'a Option<RunStart>,
            stop: &'a Option<RunStop>,
            descriptors: &'a BTreeMap<String, StreamDescriptor>,
        }

        #[derive(Serialize)]
        struct Sidecar<'a> {
            metadata: Metadata<'a>,
            streams: &'a BTreeMap<String, StreamRecord>,
        }

        serde_json::to_value(Sidecar {
            metadata: Metadata {
                start: &self.start,
                stop: &self.stop,
                descriptors: &self.descriptors,
            },
            streams: &self.streams,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
