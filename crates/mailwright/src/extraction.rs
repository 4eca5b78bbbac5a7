//! Incremental extraction of `subject`/`body` from a streamed JSON answer.
//!
//! [`scanner`] walks the text once, character by character, and reports
//! `subject`/`body` string fields as their closing quote arrives and whole
//! objects as their closing brace arrives. [`engine`] turns those reports into
//! deduplicated [`SseEvent`](crate::models::event::SseEvent)s.

pub mod engine;
pub mod scanner;

pub use engine::ExtractionState;
pub use scanner::{Field, JsonFieldScanner, ScanEvent};
