//! Document types for one experiment run.
//!
//! The shapes are fixed by an external schema; this module only types the
//! parts the exporter routes on. Everything else is retained in `extra`
//! maps so that file-name templates can reach free-form metadata fields.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::BulkEvent;
use crate::error::DocumentError;

// =============================================================================
// Document Kind
// =============================================================================

/// Kind tag of a document in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Start,
    Descriptor,
    Event,
    EventPage,
    BulkEvent,
    Stop,
}

impl DocumentKind {
    /// The schema name of this kind, as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Start => "start",
            DocumentKind::Descriptor => "descriptor",
            DocumentKind::Event => "event",
            DocumentKind::EventPage => "event_page",
            DocumentKind::BulkEvent => "bulk_event",
            DocumentKind::Stop => "stop",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(DocumentKind::Start),
            "descriptor" => Ok(DocumentKind::Descriptor),
            "event" => Ok(DocumentKind::Event),
            "event_page" => Ok(DocumentKind::EventPage),
            // Historical spelling used by the deprecated bulk form.
            "bulk_event" | "bulk_events" => Ok(DocumentKind::BulkEvent),
            "stop" => Ok(DocumentKind::Stop),
            other => Err(DocumentError::UnknownKind(other.to_string())),
        }
    }
}

// =============================================================================
// Run Boundary Documents
// =============================================================================

/// Document opening a run. Carries an open-ended mapping of metadata
/// fields used for templated naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStart {
    /// Unique id of the run
    pub uid: String,

    /// Wall-clock time the run started, seconds since the epoch
    pub time: f64,

    /// Free-form metadata (plan name, sample, proposal id, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunStart {
    /// Look up a field for template resolution.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "uid" => Some(Value::String(self.uid.clone())),
            "time" => serde_json::Number::from_f64(self.time).map(Value::Number),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// Document closing a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStop {
    /// Unique id of this stop document
    pub uid: String,

    /// Wall-clock time the run stopped, seconds since the epoch
    pub time: f64,

    /// Uid of the start document this stop closes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_start: Option<String>,

    /// Outcome reported by the data source (e.g. "success", "abort")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<String>,

    /// Free-form metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Stream Descriptor
// =============================================================================

/// Declared shape and type of one field within a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataKey {
    /// Declared type; only `"array"` fields are candidates for image data
    pub dtype: String,

    /// Declared dimensions; absent or empty means scalar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<u64>>,

    /// Hardware source identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Free-form metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataKey {
    /// Number of declared dimensions (0 for scalars).
    pub fn declared_ndim(&self) -> usize {
        self.shape.as_ref().map_or(0, Vec::len)
    }

    /// Whether this field is image-like: declared type `"array"` with a
    /// 2- or 3-dimensional shape. Only image-like fields produce TIFF
    /// output; everything else stays in the metadata sidecar.
    pub fn is_image(&self) -> bool {
        let ndim = self.declared_ndim();
        self.dtype == "array" && (2..=3).contains(&ndim)
    }
}

/// Document declaring a stream: its human-readable name and the shape of
/// every field it will emit. A stream may be declared by more than one
/// descriptor over the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Unique id of this descriptor; events reference it
    pub uid: String,

    /// Human-readable stream name (e.g. "primary", "baseline")
    pub name: String,

    /// Uid of the start document this descriptor belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_start: Option<String>,

    /// Field declarations, keyed by field name
    pub data_keys: BTreeMap<String, DataKey>,

    /// Free-form metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamDescriptor {
    /// Look up a field for template resolution.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "uid" => Some(Value::String(self.uid.clone())),
            "name" => Some(Value::String(self.name.clone())),
            other => self.extra.get(other).cloned(),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// One timestamped sample for a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Descriptor uid this event belongs to
    pub descriptor: String,

    /// Unique id of the event
    pub uid: String,

    /// 1-based sequence number within the stream
    pub seq_num: u64,

    /// Wall-clock time of the event, seconds since the epoch
    pub time: f64,

    /// Field values; image-like fields carry nested numeric arrays
    pub data: BTreeMap<String, Value>,

    /// Per-field hardware timestamps
    #[serde(default)]
    pub timestamps: BTreeMap<String, f64>,
}

/// Batched form of [`Event`]: parallel arrays across multiple events of
/// the same descriptor. This is the canonical shape all event-carrying
/// documents are normalized into before routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    /// Descriptor uid all events in this page belong to
    pub descriptor: String,

    /// Event uids, one per sample
    pub uid: Vec<String>,

    /// Sequence numbers, one per sample
    pub seq_num: Vec<u64>,

    /// Event times, one per sample
    pub time: Vec<f64>,

    /// Field values, each holding one entry per sample
    pub data: BTreeMap<String, Vec<Value>>,

    /// Per-field hardware timestamps, each holding one entry per sample
    #[serde(default)]
    pub timestamps: BTreeMap<String, Vec<f64>>,
}

impl EventPage {
    /// Number of events in this page.
    pub fn len(&self) -> usize {
        self.uid.len()
    }

    /// Whether the page carries no events.
    pub fn is_empty(&self) -> bool {
        self.uid.is_empty()
    }
}

// =============================================================================
// Parsed Document
// =============================================================================

/// A document paired with its kind, parsed into the typed model.
#[derive(Debug, Clone)]
pub enum Document {
    Start(RunStart),
    Descriptor(StreamDescriptor),
    Event(Event),
    EventPage(EventPage),
    BulkEvent(BulkEvent),
    Stop(RunStop),
}

impl Document {
    /// Parse a raw JSON document of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Malformed`] if the payload does not match
    /// the schema for `kind`.
    pub fn parse(kind: DocumentKind, raw: &Value) -> Result<Self, DocumentError> {
        fn typed<T: serde::de::DeserializeOwned>(
            kind: DocumentKind,
            raw: &Value,
        ) -> Result<T, DocumentError> {
            serde_json::from_value(raw.clone()).map_err(|e| DocumentError::Malformed {
                kind: kind.as_str(),
                message: e.to_string(),
            })
        }

        match kind {
            DocumentKind::Start => typed(kind, raw).map(Document::Start),
            DocumentKind::Descriptor => typed(kind, raw).map(Document::Descriptor),
            DocumentKind::Event => typed(kind, raw).map(Document::Event),
            DocumentKind::EventPage => typed(kind, raw).map(Document::EventPage),
            DocumentKind::BulkEvent => typed(kind, raw).map(Document::BulkEvent),
            DocumentKind::Stop => typed(kind, raw).map(Document::Stop),
        }
    }

    /// The kind tag of this document.
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Start(_) => DocumentKind::Start,
            Document::Descriptor(_) => DocumentKind::Descriptor,
            Document::Event(_) => DocumentKind::Event,
            Document::EventPage(_) => DocumentKind::EventPage,
            Document::BulkEvent(_) => DocumentKind::BulkEvent,
            Document::Stop(_) => DocumentKind::Stop,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
