//! Templated file naming for export artifacts.
//!
//! Output file names start with a caller-supplied prefix that may embed
//! placeholders resolved against documents of the current run, e.g.
//! `scan_{start[uid]}-` or `{stream_name}_{field}-`. Because `{start[...]}`
//! fields only become known when the start document arrives, templates are
//! parsed eagerly at construction but resolved lazily at first use, so no
//! artifact is ever created before the naming context exists.

mod template;

pub use template::{FileNameTemplate, TemplateContext, DEFAULT_FILE_PREFIX};
