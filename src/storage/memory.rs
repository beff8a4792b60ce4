//! In-memory artifact manager.
//!
//! Useful for tests and for callers that want the serialized bytes
//! without touching the filesystem. The manager is cheaply clonable and
//! all clones share state, so a caller can keep one clone, hand another
//! to the serializer, and inspect the buffers after the run closes.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use crate::error::StorageError;
use crate::storage::{ArtifactLabel, ArtifactManager, ArtifactSink, Artifacts};

// =============================================================================
// SharedBuffer
// =============================================================================

/// Growable in-memory sink shared between the manager and the writer
/// that borrows it. The manager retains a handle from creation until
/// close, so the bytes stay reachable after the writer is dropped.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl SharedBuffer {
    /// Snapshot of the bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        match self.inner.lock() {
            Ok(cursor) => cursor.get_ref().clone(),
            Err(poisoned) => poisoned.into_inner().get_ref().clone(),
        }
    }

    fn locked(&self) -> io::Result<std::sync::MutexGuard<'_, Cursor<Vec<u8>>>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("shared buffer lock poisoned"))
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.locked()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.locked()?.flush()
    }
}

impl Seek for SharedBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.locked()?.seek(pos)
    }
}

// =============================================================================
// MemoryBufferManager
// =============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    buffers: BTreeMap<String, SharedBuffer>,
    artifacts: Artifacts,
}

/// Artifact manager that writes every artifact to a [`SharedBuffer`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBufferManager {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryBufferManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes of a named artifact, if it was opened.
    pub fn buffer(&self, name: &str) -> Option<Vec<u8>> {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.buffers.get(name).map(SharedBuffer::contents)
    }

    /// Names of every artifact opened so far, in order of name.
    pub fn names(&self) -> Vec<String> {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.buffers.keys().cloned().collect()
    }
}

impl ArtifactManager for MemoryBufferManager {
    fn open(
        &mut self,
        label: ArtifactLabel,
        name: &str,
    ) -> Result<Box<dyn ArtifactSink>, StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StorageError::Io {
                name: name.to_string(),
                source: io::Error::other("memory manager lock poisoned"),
            })?;

        if inner.buffers.contains_key(name) {
            return Err(StorageError::DuplicateArtifact(name.to_string()));
        }

        let buffer = SharedBuffer::default();
        inner.buffers.insert(name.to_string(), buffer.clone());
        inner
            .artifacts
            .entry(label)
            .or_default()
            .push(name.into());
        Ok(Box::new(buffer))
    }

    fn artifacts(&self) -> Artifacts {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.artifacts.clone()
    }

    fn close(&mut self) -> Result<(), StorageError> {
        // Buffers stay readable after close so callers can collect them.
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
