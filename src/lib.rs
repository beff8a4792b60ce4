//! # Run Exporter
//!
//! Serializer utilities that consume a stream of scientific-experiment
//! documents (run metadata, stream descriptors, per-event detector
//! readings) and write the 2D/3D image fields out as TIFF files plus a
//! companion JSON metadata sidecar.
//!
//! ## Features
//!
//! - **Document routing**: `start`/`descriptor`/`event`/`event_page`/
//!   `bulk_event`/`stop` documents are routed through one canonical
//!   event-page path
//! - **Two layouts**: one stacked multi-page TIFF per (stream, field),
//!   or one single-frame file per image with a running counter
//! - **Templated naming**: file names resolve placeholders like
//!   `{start[uid]}` and `{stream_name}` against the run's own documents
//! - **Pluggable storage**: artifacts go to a directory or to in-memory
//!   buffers behind the same manager interface
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`document`] - typed document model and event-page normalization
//! - [`naming`] - file-name template parsing and resolution
//! - [`storage`] - artifact managers (directory-backed and in-memory)
//! - [`export`] - the serializer, frame extraction, TIFF writing, sidecar
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use run_exporter::{export, DocumentKind, SerializerOptions};
//!
//! fn main() -> Result<(), run_exporter::ExportError> {
//!     let documents: Vec<(DocumentKind, serde_json::Value)> = vec![
//!         // ("start", {...}), ("descriptor", {...}), events, ("stop", {...})
//!     ];
//!
//!     let artifacts = export(documents, "./out", SerializerOptions::default())?;
//!     for (label, paths) in &artifacts {
//!         println!("{label}: {} artifact(s)", paths.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod naming;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use document::{
    bulk_to_pages, event_to_page, BulkEvent, DataKey, Document, DocumentKind, Event, EventPage,
    RunStart, RunStop, StreamDescriptor,
};
pub use error::{DocumentError, ExportError, StorageError, TemplateError};
pub use export::{
    export, FrameCompression, FrameWriter, LayoutMode, OutputDType, RunSidecar, Serializer,
    SerializerOptions, StreamRecord, TiffOptions,
};
pub use naming::{FileNameTemplate, TemplateContext, DEFAULT_FILE_PREFIX};
pub use storage::{
    ArtifactLabel, ArtifactManager, ArtifactSink, Artifacts, MemoryBufferManager, MultiFileManager,
    SharedBuffer,
};
