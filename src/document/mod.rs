//! Typed model of the experiment document stream.
//!
//! A run is an ordered sequence of `(kind, document)` pairs following an
//! externally defined schema: one `start`, any number of `descriptor` and
//! event-carrying documents, and one `stop`. Events come in three wire
//! shapes (`event`, `event_page`, `bulk_event`); [`normalize`] converts
//! all three into the canonical [`EventPage`] before any business logic
//! runs, so the serializer only ever routes event pages.

mod normalize;
mod types;

pub use normalize::{bulk_to_pages, event_to_page};
pub use types::{
    DataKey, Document, DocumentKind, Event, EventPage, RunStart, RunStop, StreamDescriptor,
};

/// Deprecated batched event form: stream name to the events of that stream.
pub type BulkEvent = std::collections::BTreeMap<String, Vec<Event>>;
