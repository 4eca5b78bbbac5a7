use serde_json::Value;
use std::ops::Range;
use tracing::debug;

use super::scanner::{Field, JsonFieldScanner, ScanEvent};
use crate::models::draft::EmailDraft;
use crate::models::event::SseEvent;

/// Last value sent for one field
#[derive(Debug, Default)]
struct Emitted {
    last: String,
    sent: bool,
}

impl Emitted {
    /// A value goes out when it differs from the last one sent, and an empty
    /// value only replaces one that was already sent.
    fn offer(&mut self, value: String) -> Option<String> {
        if value == self.last || (value.is_empty() && !self.sent) {
            return None;
        }
        self.last.clone_from(&value);
        self.sent = true;
        Some(value)
    }
}

/// Accumulates streamed fragments and emits `Subject`/`Body` events as
/// complete values become available.
///
/// Every byte is scanned once, so the total work is linear in the size of the
/// answer. The event sequence does not depend on how the text was split into
/// fragments.
#[derive(Debug, Default)]
pub struct ExtractionState {
    raw: String,
    scanned: usize,
    scanner: JsonFieldScanner,
    subject: Emitted,
    body: Emitted,
}

impl ExtractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the events it completes
    pub fn push(&mut self, fragment: &str) -> Vec<SseEvent> {
        self.raw.push_str(fragment);

        let mut found = Vec::new();
        for (offset, ch) in self.raw[self.scanned..].char_indices() {
            if let Some(event) = self.scanner.advance(self.scanned + offset, ch) {
                found.push(event);
            }
        }
        self.scanned = self.raw.len();

        let mut events = Vec::new();
        for event in found {
            match event {
                ScanEvent::FieldClosed(field, value) => events.extend(self.offer(field, value)),
                ScanEvent::ObjectClosed(range) => events.extend(self.confirm(range)),
            }
        }
        events
    }

    /// Fill fields that were never sent from `draft`, skipping empty values
    pub fn fill_missing(&mut self, draft: &EmailDraft) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.subject.sent {
            events.extend(self.offer(Field::Subject, draft.subject.clone()));
        }
        if !self.body.sent {
            events.extend(self.offer(Field::Body, draft.body.clone()));
        }
        events
    }

    pub fn has_subject(&self) -> bool {
        self.subject.sent
    }

    pub fn has_body(&self) -> bool {
        self.body.sent
    }

    pub fn is_complete(&self) -> bool {
        self.has_subject() && self.has_body()
    }

    /// Everything received so far
    pub fn raw(&self) -> &str {
        &self.raw
    }

    fn offer(&mut self, field: Field, value: String) -> Option<SseEvent> {
        match field {
            Field::Subject => self.subject.offer(value).map(SseEvent::Subject),
            Field::Body => self.body.offer(value).map(SseEvent::Body),
        }
    }

    /// Parse a closed outermost object as a whole; its own `subject`/`body`
    /// win over anything reported from nested objects inside it.
    fn confirm(&mut self, range: Range<usize>) -> Vec<SseEvent> {
        let object = match serde_json::from_str::<Value>(&self.raw[range]) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Vec::new(),
            Err(e) => {
                debug!("Closed object is not valid JSON: {}", e);
                return Vec::new();
            }
        };

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        let (subject, body) = (text("subject"), text("body"));

        let mut events = Vec::new();
        if let Some(subject) = subject {
            events.extend(self.offer(Field::Subject, subject));
        }
        if let Some(body) = body {
            events.extend(self.offer(Field::Body, body));
        }
        events
    }
}
