//! The stream router / serializer.
//!
//! Consumes `(kind, document)` pairs in arrival order, routes each kind
//! to its handler, and writes image frames to per-(stream, field) TIFF
//! artifacts as they arrive. File names are templated against documents
//! of the run, so no artifact is created before the start document.
//!
//! Resource lifecycle is scoped: the serializer owns its TIFF writers
//! and its artifact manager, so dropping it (on any exit path) releases
//! every file handle. [`close`](Serializer::close) does the same
//! eagerly and is idempotent.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;

use ndarray::ArrayView2;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::document::{
    bulk_to_pages, event_to_page, Document, DocumentKind, EventPage, RunStart, RunStop,
    StreamDescriptor,
};
use crate::error::{DocumentError, ExportError};
use crate::export::frames::{decode_array, split_frames, OutputDType};
use crate::export::sidecar::RunSidecar;
use crate::export::writer::{FrameWriter, TiffOptions};
use crate::naming::{FileNameTemplate, TemplateContext, DEFAULT_FILE_PREFIX};
use crate::storage::{ArtifactLabel, ArtifactManager, Artifacts, MultiFileManager};

// =============================================================================
// Options
// =============================================================================

/// Output layout, fixed per serializer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LayoutMode {
    /// One TIFF per (stream, field); frames appended as pages
    #[default]
    Stacked,

    /// One TIFF per frame, with a zero-padded running counter per
    /// (stream, field) in the file name
    Series,
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LayoutMode::Stacked => "stacked",
            LayoutMode::Series => "series",
        };
        f.write_str(name)
    }
}

/// Construction-time options for a [`Serializer`].
#[derive(Debug, Clone)]
pub struct SerializerOptions {
    /// File-name prefix template; see [`FileNameTemplate`]
    pub file_prefix: String,

    /// Numeric type of the TIFF samples
    pub dtype: OutputDType,

    /// TIFF container options
    pub tiff: TiffOptions,

    /// Stacked vs series layout
    pub layout: LayoutMode,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            dtype: OutputDType::default(),
            tiff: TiffOptions::default(),
            layout: LayoutMode::default(),
        }
    }
}

// =============================================================================
// Serializer
// =============================================================================

/// Key of an open TIFF writer. The frame index is only present in
/// series layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct WriterKey {
    stream: String,
    field: String,
    index: Option<u64>,
}

/// Serialize one run's document stream to TIFF artifacts plus a JSON
/// metadata sidecar.
///
/// The serializer accepts documents from exactly one run: one `start`,
/// then descriptors and events, then one `stop`. A second start document
/// is fatal; documents outside the run boundaries are errors.
pub struct Serializer {
    manager: Box<dyn ArtifactManager>,
    template: FileNameTemplate,
    options: SerializerOptions,

    start: Option<RunStart>,
    stopped: bool,

    /// Descriptor uid to descriptor, for event routing
    descriptors: HashMap<String, StreamDescriptor>,

    /// Open TIFF writers, created lazily on first frame per key
    writers: BTreeMap<WriterKey, FrameWriter>,

    /// Series layout: next frame index per (stream, field)
    series_counters: BTreeMap<(String, String), u64>,

    sidecar: RunSidecar,
}

impl Serializer {
    /// Create a serializer writing files under `directory`.
    pub fn new(
        directory: impl Into<PathBuf>,
        options: SerializerOptions,
    ) -> Result<Self, ExportError> {
        Self::with_manager(Box::new(MultiFileManager::new(directory)), options)
    }

    /// Create a serializer over an injected artifact manager (e.g. a
    /// [`crate::storage::MemoryBufferManager`]).
    pub fn with_manager(
        manager: Box<dyn ArtifactManager>,
        options: SerializerOptions,
    ) -> Result<Self, ExportError> {
        let template = FileNameTemplate::parse(&options.file_prefix)?;

        Ok(Self {
            manager,
            template,
            options,
            start: None,
            stopped: false,
            descriptors: HashMap::new(),
            writers: BTreeMap::new(),
            series_counters: BTreeMap::new(),
            sidecar: RunSidecar::default(),
        })
    }

    /// Snapshot of every artifact written so far, grouped by label.
    pub fn artifacts(&self) -> Artifacts {
        self.manager.artifacts()
    }

    /// Parse a raw JSON document of the given kind and route it.
    pub fn process(&mut self, kind: DocumentKind, raw: &Value) -> Result<(), ExportError> {
        let document = Document::parse(kind, raw)?;
        self.process_document(document)
    }

    /// Route a typed document to its handler. Single events and the
    /// deprecated bulk form are normalized into event pages first.
    pub fn process_document(&mut self, document: Document) -> Result<(), ExportError> {
        match document {
            Document::Start(doc) => self.start(doc),
            Document::Descriptor(doc) => self.descriptor(doc),
            Document::Event(doc) => self.event_page(event_to_page(doc)),
            Document::EventPage(doc) => self.event_page(doc),
            Document::BulkEvent(doc) => {
                for page in bulk_to_pages(doc) {
                    self.event_page(page)?;
                }
                Ok(())
            }
            Document::Stop(doc) => self.stop(doc),
        }
    }

    /// Handle the start document: record it for templating and the
    /// sidecar.
    ///
    /// # Errors
    ///
    /// [`DocumentError::MultipleRuns`] if a start document was already
    /// received.
    pub fn start(&mut self, doc: RunStart) -> Result<(), ExportError> {
        if self.start.is_some() {
            return Err(DocumentError::MultipleRuns.into());
        }
        if self.stopped {
            return Err(DocumentError::RunClosed { kind: "start" }.into());
        }

        info!(uid = %doc.uid, "run started");
        self.sidecar.set_start(doc.clone());
        self.start = Some(doc);
        Ok(())
    }

    /// Handle a descriptor document: register the uid → stream mapping
    /// and the field declarations. Opens no files; naming is deferred
    /// until the first frame.
    pub fn descriptor(&mut self, doc: StreamDescriptor) -> Result<(), ExportError> {
        self.ensure_open("descriptor")?;

        debug!(uid = %doc.uid, stream = %doc.name, "descriptor registered");
        self.sidecar.record_descriptor(&doc);
        self.descriptors.insert(doc.uid.clone(), doc);
        Ok(())
    }

    /// Handle an event page: write every image-like field's samples as
    /// TIFF frames and accumulate sidecar bookkeeping.
    ///
    /// Fields whose declared shape is not 2- or 3-dimensional `"array"`
    /// data are skipped. A declared/actual shape mismatch is a warning,
    /// and the actual dimensionality governs the write.
    pub fn event_page(&mut self, page: EventPage) -> Result<(), ExportError> {
        self.ensure_open("event_page")?;

        let descriptor = self
            .descriptors
            .get(&page.descriptor)
            .ok_or_else(|| DocumentError::UnknownDescriptor(page.descriptor.clone()))?
            .clone();
        let stream = descriptor.name.clone();

        self.sidecar.record_page(&stream, &page);

        for (field, samples) in &page.data {
            let Some(data_key) = descriptor.data_keys.get(field) else {
                debug!(stream = %stream, field = %field, "field not declared in descriptor, skipping");
                continue;
            };
            if !data_key.is_image() {
                trace!(
                    stream = %stream,
                    field = %field,
                    ndim = data_key.declared_ndim(),
                    "field is not image-like, skipping"
                );
                continue;
            }

            for (sample, value) in samples.iter().enumerate() {
                let array = decode_array(field, value)?;
                if array.ndim() != data_key.declared_ndim() {
                    warn!(
                        stream = %stream,
                        field = %field,
                        declared = data_key.declared_ndim(),
                        actual = array.ndim(),
                        "declared/actual shape mismatch, using actual dimensionality"
                    );
                }

                let Some(frames) = split_frames(array) else {
                    debug!(
                        stream = %stream,
                        field = %field,
                        "sample is not 2- or 3-dimensional, skipping"
                    );
                    continue;
                };

                for frame in &frames {
                    self.write_frame(&descriptor, &page, sample, field, frame.view())?;
                }
            }
        }

        Ok(())
    }

    /// Handle the stop document: write the metadata sidecar and close
    /// everything.
    pub fn stop(&mut self, doc: RunStop) -> Result<(), ExportError> {
        self.ensure_open("stop")?;

        info!(uid = %doc.uid, exit_status = doc.exit_status.as_deref(), "run stopped");
        self.sidecar.set_stop(doc);
        self.stopped = true;

        self.write_sidecar()?;
        self.close()
    }

    /// Flush and drop every open TIFF writer, then close the manager.
    /// Idempotent: safe to call repeatedly and after a failure.
    pub fn close(&mut self) -> Result<(), ExportError> {
        self.writers.clear();
        self.manager.close()?;
        Ok(())
    }

    fn ensure_open(&self, kind: &'static str) -> Result<(), DocumentError> {
        if self.start.is_none() {
            return Err(DocumentError::RunNotStarted { kind });
        }
        if self.stopped {
            return Err(DocumentError::RunClosed { kind });
        }
        Ok(())
    }

    fn write_frame(
        &mut self,
        descriptor: &StreamDescriptor,
        page: &EventPage,
        sample: usize,
        field: &str,
        frame: ArrayView2<'_, f64>,
    ) -> Result<(), ExportError> {
        let stream = descriptor.name.as_str();
        let key = match self.options.layout {
            LayoutMode::Stacked => WriterKey {
                stream: stream.to_string(),
                field: field.to_string(),
                index: None,
            },
            LayoutMode::Series => {
                let counter = self
                    .series_counters
                    .entry((stream.to_string(), field.to_string()))
                    .or_insert(0);
                let index = *counter;
                *counter += 1;
                WriterKey {
                    stream: stream.to_string(),
                    field: field.to_string(),
                    index: Some(index),
                }
            }
        };

        if !self.writers.contains_key(&key) {
            let writer = self.open_writer(descriptor, page, sample, field, &key)?;
            self.writers.insert(key.clone(), writer);
        }
        if let Some(writer) = self.writers.get_mut(&key) {
            writer.append(frame, self.options.dtype)?;
        }
        Ok(())
    }

    /// Resolve the template and open a fresh artifact plus its TIFF
    /// writer for `key`.
    fn open_writer(
        &mut self,
        descriptor: &StreamDescriptor,
        page: &EventPage,
        sample: usize,
        field: &str,
        key: &WriterKey,
    ) -> Result<FrameWriter, ExportError> {
        let start = self
            .start
            .as_ref()
            .ok_or(DocumentError::RunNotStarted { kind: "event_page" })?;

        let mut cx = TemplateContext::run_scope(start).with_stream(descriptor, field);
        if let (Some(uid), Some(&seq_num), Some(&time)) = (
            page.uid.get(sample),
            page.seq_num.get(sample),
            page.time.get(sample),
        ) {
            cx = cx.with_event(uid, seq_num, time);
        }
        let prefix = self.template.resolve(&cx)?;

        let name = match key.index {
            None => format!("{prefix}{}-{}.tiff", key.stream, key.field),
            Some(index) => format!("{prefix}{}-{}-{index:05}.tiff", key.stream, key.field),
        };

        debug!(artifact = %name, "opening stream data artifact");
        let sink = self.manager.open(ArtifactLabel::StreamData, &name)?;
        FrameWriter::create(sink, &self.options.tiff, name)
    }

    fn write_sidecar(&mut self) -> Result<(), ExportError> {
        let start = self
            .start
            .as_ref()
            .ok_or(DocumentError::RunNotStarted { kind: "stop" })?;

        // Run-wide name: only the start document is in scope here.
        let prefix = self.template.resolve(&TemplateContext::run_scope(start))?;
        let name = format!("{prefix}meta.json");

        debug!(artifact = %name, "writing metadata sidecar");
        let mut sink = self.manager.open(ArtifactLabel::RunMetadata, &name)?;
        let value = self.sidecar.to_value()?;
        serde_json::to_writer(&mut sink, &value)?;
        sink.flush().map_err(|source| crate::error::StorageError::Io {
            name,
            source,
        })?;
        Ok(())
    }
}

// =============================================================================
// Export Driver
// =============================================================================

/// Export a full document sequence to TIFF files under `directory`.
///
/// Drives a [`Serializer`] over the sequence with guaranteed cleanup:
/// every opened file is released whether processing succeeds or fails.
/// Returns the mapping from artifact label to the artifacts written.
pub fn export<I>(
    documents: I,
    directory: impl Into<PathBuf>,
    options: SerializerOptions,
) -> Result<Artifacts, ExportError>
where
    I: IntoIterator<Item = (DocumentKind, Value)>,
{
    let mut serializer = Serializer::new(directory, options)?;

    let fed = documents
        .into_iter()
        .try_for_each(|(kind, doc)| serializer.process(kind, &doc));
    let closed = serializer.close();
    fed?;
    closed?;

    Ok(serializer.artifacts())
}

// =============================================================================
// Tests
// =============================================================================
