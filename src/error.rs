use thiserror::Error;

/// Errors raised while classifying or decoding input documents
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Document kind string is not part of the document schema
    #[error("Unknown document kind: {0:?}")]
    UnknownKind(String),

    /// Document payload does not match the schema for its kind
    #[error("Malformed {kind} document: {message}")]
    Malformed { kind: &'static str, message: String },

    /// Event references a descriptor that was never registered
    #[error("Unknown descriptor id: {0}")]
    UnknownDescriptor(String),

    /// A second start document was received (one run per serializer)
    #[error(
        "The serializer expects documents from one run only; \
         a second start document was received"
    )]
    MultipleRuns,

    /// A document arrived before the run was opened by a start document
    #[error("Received a {kind} document before the start document")]
    RunNotStarted { kind: &'static str },

    /// A document arrived after the stop document closed the run
    #[error("Received a {kind} document after the stop document")]
    RunClosed { kind: &'static str },

    /// Field data is not a rectangular numeric array
    #[error("Field {field:?}: {message}")]
    BadFieldData { field: String, message: String },
}

/// Errors raised while parsing or resolving a file-name template
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    /// Placeholder opened with `{` but never closed
    #[error("Unterminated placeholder at byte {position} in template {template:?}")]
    Unterminated { template: String, position: usize },

    /// Placeholder name is not one of the recognized options
    #[error(
        "Unknown placeholder {name:?} in template {template:?} \
         (expected start, descriptor, event, stream_name or field)"
    )]
    UnknownPlaceholder { template: String, name: String },

    /// Placeholder syntax is invalid (e.g. malformed `[key]` brackets)
    #[error("Invalid placeholder syntax {text:?} in template {template:?}")]
    InvalidSyntax { template: String, text: String },

    /// Referenced document has no such field
    #[error("Placeholder {placeholder:?} references missing field {key:?}")]
    MissingField { placeholder: String, key: String },

    /// Placeholder's document is not in scope at this point of the run
    #[error("Placeholder {placeholder:?} cannot be resolved in this context")]
    OutOfScope { placeholder: String },
}

/// Errors raised by artifact managers when opening or closing sinks
#[derive(Debug, Error)]
pub enum StorageError {
    /// The same artifact name was requested twice
    #[error("Artifact name collision: {0:?} was already opened")]
    DuplicateArtifact(String),

    /// Underlying I/O failure while creating or writing an artifact
    #[error("I/O error for artifact {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type for the export pipeline.
///
/// Wraps the per-concern errors plus failures from the TIFF codec and the
/// JSON serializer. All variants are fatal to the run; the serializer
/// still releases every open artifact on the way out.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Document routing or decoding failure
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// File-name template failure
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Artifact manager failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// TIFF encoding failure
    #[error("TIFF encoding error: {0}")]
    Encode(#[from] tiff::TiffError),

    /// Metadata sidecar serialization failure
    #[error("Metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}
