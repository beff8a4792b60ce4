//! Artifact management for export output.
//!
//! The serializer never touches the filesystem directly: it asks an
//! [`ArtifactManager`] for named, label-tracked byte sinks and writes
//! through them. Two implementations are provided:
//!
//! - [`MultiFileManager`] creates real files under an output directory.
//! - [`MemoryBufferManager`] collects everything in shared in-memory
//!   buffers, for tests and for callers that post-process the bytes.
//!
//! Managers own the artifact ledger for the lifetime of a run and
//! guarantee that requesting the same name twice is an error, so two
//! writers can never silently share an output file.

mod file_manager;
mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Seek, Write};
use std::path::PathBuf;

use crate::error::StorageError;

pub use file_manager::MultiFileManager;
pub use memory::{MemoryBufferManager, SharedBuffer};

// =============================================================================
// Artifact Labels
// =============================================================================

/// Category of an output artifact, used to group the returned paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactLabel {
    /// Per-stream image data (TIFF files)
    StreamData,

    /// Run-wide metadata (the JSON sidecar)
    RunMetadata,
}

impl ArtifactLabel {
    /// The label string used in the artifacts mapping.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactLabel::StreamData => "stream_data",
            ArtifactLabel::RunMetadata => "run_metadata",
        }
    }
}

impl fmt::Display for ArtifactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from artifact label to the artifacts written under it.
pub type Artifacts = BTreeMap<ArtifactLabel, Vec<PathBuf>>;

// =============================================================================
// Sinks
// =============================================================================

/// A writable, seekable byte sink handed out by an [`ArtifactManager`].
///
/// Seekability is required because the TIFF encoder patches directory
/// offsets after writing pixel data.
pub trait ArtifactSink: Write + Seek + Send + fmt::Debug {}

impl<T: Write + Seek + Send + fmt::Debug> ArtifactSink for T {}

// =============================================================================
// ArtifactManager Trait
// =============================================================================

/// Capability that opens named output sinks on demand and tracks every
/// artifact opened during a run.
///
/// Implementations must enforce create-new semantics: a name may be
/// opened at most once per manager, and a pre-existing artifact with the
/// same name is a [`StorageError::DuplicateArtifact`].
pub trait ArtifactManager {
    /// Open a new sink for the artifact `name` under `label`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateArtifact`] when the name was
    /// already opened (or already exists on disk), or
    /// [`StorageError::Io`] on filesystem failure.
    fn open(
        &mut self,
        label: ArtifactLabel,
        name: &str,
    ) -> Result<Box<dyn ArtifactSink>, StorageError>;

    /// Snapshot of every artifact opened so far, grouped by label.
    fn artifacts(&self) -> Artifacts;

    /// Release whatever the manager still holds. Idempotent.
    fn close(&mut self) -> Result<(), StorageError>;
}
