//! Directory-backed artifact manager.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::{ArtifactLabel, ArtifactManager, ArtifactSink, Artifacts};

/// Artifact manager that creates one real file per artifact under an
/// output directory.
///
/// Artifact names may contain path separators; parent directories are
/// created as needed. Files are opened with create-new semantics, so an
/// existing file with the same resolved path is reported as a name
/// collision rather than overwritten.
///
/// File handles are moved into the caller (the TIFF writers own them and
/// close them on drop); the manager keeps the path ledger that callers
/// use for verification and cleanup.
#[derive(Debug)]
pub struct MultiFileManager {
    root: PathBuf,
    reserved: BTreeSet<PathBuf>,
    artifacts: Artifacts,
}

impl MultiFileManager {
    /// Create a manager rooted at `directory`. The directory itself is
    /// created lazily on the first artifact.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            root: directory.into(),
            reserved: BTreeSet::new(),
            artifacts: Artifacts::new(),
        }
    }

    /// The output directory artifacts are rooted under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactManager for MultiFileManager {
    fn open(
        &mut self,
        label: ArtifactLabel,
        name: &str,
    ) -> Result<Box<dyn ArtifactSink>, StorageError> {
        let path = self.root.join(name);
        if !self.reserved.insert(path.clone()) {
            return Err(StorageError::DuplicateArtifact(name.to_string()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                name: name.to_string(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::DuplicateArtifact(name.to_string())
                } else {
                    StorageError::Io {
                        name: name.to_string(),
                        source,
                    }
                }
            })?;

        self.artifacts.entry(label).or_default().push(path);
        Ok(Box::new(file))
    }

    fn artifacts(&self) -> Artifacts {
        self.artifacts.clone()
    }

    fn close(&mut self) -> Result<(), StorageError> {
        // Sinks were moved out and close on drop; only the ledger lives here.
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
