//! Server-sent event framing for generation events.
//!
//! The server writes one `data: <json>\n\n` record per [`SseEvent`]. Readers
//! receive the bytes in arbitrary pieces, so both decoders here keep an
//! incomplete trailing line until the rest of it arrives.

use tracing::{debug, warn};

use crate::models::event::SseEvent;

/// Frame one event as an SSE record
pub fn encode(event: &SseEvent) -> String {
    let payload = serde_json::to_string(event).unwrap_or_else(|e| {
        warn!("Failed to encode event {:?}: {}", event, e);
        r#"{"type":"error","data":"Failed to encode event"}"#.to_string()
    });
    format!("data: {}\n\n", payload)
}

/// Splits a byte stream into SSE lines and yields the payload of each `data` line.
///
/// Lines are split on `\n` before UTF-8 decoding, so a multi-byte character
/// cut across two reads is reassembled intact. Blank lines, comments
/// (leading `:`) and other fields such as `event:` or `id:` are dropped.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    pending: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(|line| data_payload(&String::from_utf8_lossy(line)))
            .collect()
    }

    /// Bytes held back waiting for the end of their line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn data_payload(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

/// Decodes generation events from the raw response body.
///
/// Once a terminal event has been produced the decoder is finished and
/// ignores anything that follows it.
#[derive(Debug, Default)]
pub struct EventDecoder {
    lines: SseLineDecoder,
    finished: bool,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.finished {
            return Vec::new();
        }

        let mut events = Vec::new();
        for payload in self.lines.feed(chunk) {
            if let Some(event) = parse_event(&payload) {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    self.finished = true;
                    break;
                }
            }
        }
        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Parse one `data` payload. Malformed payloads are logged and skipped.
pub fn parse_event(payload: &str) -> Option<SseEvent> {
    if payload == "[DONE]" {
        debug!("Stream ended with [DONE]");
        return Some(SseEvent::Complete);
    }
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping unparseable SSE data {:?}: {}", payload, e);
            None
        }
    }
}
