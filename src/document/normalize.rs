//! Normalization of event-carrying documents into [`EventPage`]s.
//!
//! The stream may deliver samples as single `event` documents, batched
//! `event_page` documents, or the deprecated `bulk_event` form keyed by
//! stream name. Converting the first and last into event pages up front
//! keeps the serializer's routing logic in one place.

use std::collections::BTreeMap;

use crate::document::{BulkEvent, Event, EventPage};

/// Wrap a single event into a one-sample page.
pub fn event_to_page(event: Event) -> EventPage {
    let Event {
        descriptor,
        uid,
        seq_num,
        time,
        data,
        timestamps,
    } = event;

    EventPage {
        descriptor,
        uid: vec![uid],
        seq_num: vec![seq_num],
        time: vec![time],
        data: data.into_iter().map(|(k, v)| (k, vec![v])).collect(),
        timestamps: timestamps.into_iter().map(|(k, v)| (k, vec![v])).collect(),
    }
}

/// Convert a deprecated bulk-event document into event pages.
///
/// Events are regrouped by descriptor id (a bulk document may interleave
/// descriptors under one stream name); arrival order is preserved within
/// each group. Empty groups produce no page.
pub fn bulk_to_pages(bulk: BulkEvent) -> Vec<EventPage> {
    // Group while keeping first-seen descriptor order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<Event>> = BTreeMap::new();

    for (_stream, events) in bulk {
        for event in events {
            if !groups.contains_key(&event.descriptor) {
                order.push(event.descriptor.clone());
            }
            groups.entry(event.descriptor.clone()).or_default().push(event);
        }
    }

    order
        .into_iter()
        .filter_map(|descriptor| groups.remove(&descriptor))
        .map(pack_events)
        .collect()
}

/// Pack events sharing one descriptor into a single page.
fn pack_events(events: Vec<Event>) -> EventPage {
    let mut page = EventPage {
        descriptor: events
            .first()
            .map(|e| e.descriptor.clone())
            .unwrap_or_default(),
        uid: Vec::with_capacity(events.len()),
        seq_num: Vec::with_capacity(events.len()),
        time: Vec::with_capacity(events.len()),
        data: BTreeMap::new(),
        timestamps: BTreeMap::new(),
    };

    for event in events {
        page.uid.push(event.uid);
        page.seq_num.push(event.seq_num);
        page.time.push(event.time);
        for (field, value) in event.data {
            page.data.entry(field).or_default().push(value);
        }
        for (field, ts) in event.timestamps {
            page.timestamps.entry(field).or_default().push(ts);
        }
    }

    page
}

// =============================================================================
// Tests
// =============================================================================
