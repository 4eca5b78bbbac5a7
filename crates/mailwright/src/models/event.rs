use serde::{Deserialize, Serialize};

use super::draft::AssistantKind;

/// One notification sent to the compose client during a generation cycle.
///
/// On the wire this is `{"type": ..., "data": ...}` with `data` omitted for
/// `complete`. `Complete` and `Error` are terminal: nothing follows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SseEvent {
    AssistantType(AssistantKind),
    Subject(String),
    Body(String),
    Complete,
    Error(String),
}

impl SseEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SseEvent::Complete | SseEvent::Error(_))
    }
}
