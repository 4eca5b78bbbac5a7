use std::ops::Range;

/// Fields the composer cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Subject,
    Body,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "subject" => Some(Field::Subject),
            "body" => Some(Field::Body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A string value of a `subject`/`body` key at any depth, fully unescaped
    FieldClosed(Field, String),
    /// Byte range of an outermost object that just closed, braces included
    ObjectClosed(Range<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

impl Container {
    fn closer(self) -> char {
        match self {
            Container::Object => '}',
            Container::Array => ']',
        }
    }
}

/// What the next token inside a container must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Key,
    Colon,
    Value,
    AfterValue,
}

#[derive(Debug)]
struct Frame {
    container: Container,
    slot: Slot,
    key: Option<String>,
}

impl Frame {
    fn object() -> Self {
        Self {
            container: Container::Object,
            slot: Slot::Key,
            key: None,
        }
    }

    fn array() -> Self {
        Self {
            container: Container::Array,
            slot: Slot::Value,
            key: None,
        }
    }

    /// Slot after a `,` separator
    fn next_entry(&mut self) {
        self.key = None;
        self.slot = match self.container {
            Container::Object => Slot::Key,
            Container::Array => Slot::Value,
        };
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Escape {
    #[default]
    None,
    Backslash,
    Unicode {
        digits: u8,
        code: u32,
    },
}

/// What the string currently being read will become
#[derive(Debug, Default)]
enum StringRole {
    #[default]
    Ignored,
    Key(String),
    Value(Field, String),
}

/// The current object cannot be valid JSON
struct Broken;

/// Single-pass JSON scanner tracking nesting, string and escape state.
///
/// Text outside any object (prose, code fences) is skipped. A `{` that turns
/// out not to start JSON, like `{name}` in prose, is abandoned at the first
/// character no JSON object could contain there, and scanning restarts from
/// that character. `subject`/`body` string values are reported at any depth
/// in the order they appear.
#[derive(Debug, Default)]
pub struct JsonFieldScanner {
    frames: Vec<Frame>,
    object_start: usize,
    in_string: bool,
    escape: Escape,
    high_surrogate: Option<u32>,
    role: StringRole,
}

impl JsonFieldScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character found at byte `offset` of the overall text
    pub fn advance(&mut self, offset: usize, ch: char) -> Option<ScanEvent> {
        if self.in_string {
            return self.string_char(ch);
        }
        if self.frames.is_empty() {
            if ch == '{' {
                self.object_start = offset;
                self.frames.push(Frame::object());
            }
            return None;
        }

        match self.structural(offset, ch) {
            Ok(event) => event,
            Err(Broken) => {
                self.frames.clear();
                self.advance(offset, ch)
            }
        }
    }

    fn structural(&mut self, offset: usize, ch: char) -> Result<Option<ScanEvent>, Broken> {
        let frame = self.frames.last_mut().ok_or(Broken)?;
        if ch.is_whitespace() {
            return Ok(None);
        }

        match (frame.slot, ch) {
            (Slot::Key, '"') if frame.container == Container::Object => {
                self.role = StringRole::Key(String::new());
                self.in_string = true;
            }
            (slot, c) if slot != Slot::Colon && c == frame.container.closer() => {
                return Ok(self.close(offset));
            }
            (Slot::Colon, ':') => frame.slot = Slot::Value,
            (Slot::AfterValue, ',') => frame.next_entry(),
            (Slot::Value, '"') => {
                self.role = match frame.key.as_deref().and_then(Field::from_key) {
                    Some(field) => StringRole::Value(field, String::new()),
                    None => StringRole::Ignored,
                };
                self.in_string = true;
            }
            (Slot::Value, '{') => self.frames.push(Frame::object()),
            (Slot::Value, '[') => self.frames.push(Frame::array()),
            // end of a bare scalar such as `42` or `true`
            (Slot::Value, ',') => frame.next_entry(),
            (Slot::Value, c) if c.is_ascii_alphanumeric() || "+-.".contains(c) => {}
            _ => return Err(Broken),
        }
        Ok(None)
    }

    fn close(&mut self, offset: usize) -> Option<ScanEvent> {
        self.frames.pop();
        match self.frames.last_mut() {
            Some(parent) => {
                parent.slot = Slot::AfterValue;
                None
            }
            None => Some(ScanEvent::ObjectClosed(self.object_start..offset + 1)),
        }
    }

    fn string_char(&mut self, ch: char) -> Option<ScanEvent> {
        match self.escape {
            Escape::Backslash => {
                self.escape = Escape::None;
                match ch {
                    'u' => {
                        self.escape = Escape::Unicode { digits: 0, code: 0 };
                    }
                    'n' => self.push('\n'),
                    't' => self.push('\t'),
                    'r' => self.push('\r'),
                    'b' => self.push('\u{8}'),
                    'f' => self.push('\u{c}'),
                    other => self.push(other),
                }
                None
            }
            Escape::Unicode { digits, code } => match ch.to_digit(16) {
                Some(digit) => {
                    let code = code * 16 + digit;
                    if digits == 3 {
                        self.escape = Escape::None;
                        self.push_code_unit(code);
                    } else {
                        self.escape = Escape::Unicode {
                            digits: digits + 1,
                            code,
                        };
                    }
                    None
                }
                None => {
                    self.escape = Escape::None;
                    self.push(char::REPLACEMENT_CHARACTER);
                    self.string_char(ch)
                }
            },
            Escape::None => match ch {
                '\\' => {
                    self.escape = Escape::Backslash;
                    None
                }
                '"' => self.close_string(),
                other => {
                    self.push(other);
                    None
                }
            },
        }
    }

    fn push(&mut self, ch: char) {
        let dangling = self.high_surrogate.take().is_some();
        if let StringRole::Key(text) | StringRole::Value(_, text) = &mut self.role {
            if dangling {
                text.push(char::REPLACEMENT_CHARACTER);
            }
            text.push(ch);
        }
    }

    fn push_code_unit(&mut self, code: u32) {
        match code {
            0xD800..=0xDBFF => {
                if self.high_surrogate.take().is_some() {
                    self.push(char::REPLACEMENT_CHARACTER);
                }
                self.high_surrogate = Some(code);
            }
            0xDC00..=0xDFFF => match self.high_surrogate.take() {
                Some(high) => {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                    self.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                None => self.push(char::REPLACEMENT_CHARACTER),
            },
            _ => self.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)),
        }
    }

    fn close_string(&mut self) -> Option<ScanEvent> {
        if self.high_surrogate.take().is_some() {
            self.push(char::REPLACEMENT_CHARACTER);
        }
        self.in_string = false;

        let role = std::mem::take(&mut self.role);
        let frame = self.frames.last_mut()?;
        match role {
            StringRole::Key(key) => {
                frame.key = Some(key);
                frame.slot = Slot::Colon;
                None
            }
            StringRole::Value(field, value) => {
                frame.slot = Slot::AfterValue;
                Some(ScanEvent::FieldClosed(field, value))
            }
            StringRole::Ignored => {
                frame.slot = Slot::AfterValue;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<ScanEvent> {
        let mut scanner = JsonFieldScanner::new();
        text.char_indices()
            .filter_map(|(offset, ch)| scanner.advance(offset, ch))
            .collect()
    }

    #[test]
    fn test_fields_and_object() {
        let text = r#"{"subject": "Hi", "body": "Yo"}"#;
        assert_eq!(
            scan(text),
            vec![
                ScanEvent::FieldClosed(Field::Subject, "Hi".into()),
                ScanEvent::FieldClosed(Field::Body, "Yo".into()),
                ScanEvent::ObjectClosed(0..text.len()),
            ]
        );
    }

    #[test]
    fn test_escapes_are_decoded() {
        let events = scan(r#"{"body": "He said \"hi\"\nBye \u00e9 \ud83d\ude00 \\o/"}"#);
        assert_eq!(
            events[0],
            ScanEvent::FieldClosed(Field::Body, "He said \"hi\"\nBye é 😀 \\o/".into())
        );
    }

    #[test]
    fn test_unclosed_value_reports_nothing() {
        assert!(scan(r#"{"subject": "Half a subj"#).is_empty());
    }

    #[test]
    fn test_fence_and_prose_skipped() {
        let text = "Sure! ```json\n{\"subject\":\"A\"}\n```";
        let start = text.find('{').unwrap();
        let end = text.find('}').unwrap() + 1;
        assert_eq!(
            scan(text),
            vec![
                ScanEvent::FieldClosed(Field::Subject, "A".into()),
                ScanEvent::ObjectClosed(start..end),
            ]
        );
    }

    #[test]
    fn test_nested_fields_reported_in_order() {
        let text = r#"{"meta": {"subject": "inner", "list": ["}", "{", 3]}, "subject": "outer"}"#;
        assert_eq!(
            scan(text),
            vec![
                ScanEvent::FieldClosed(Field::Subject, "inner".into()),
                ScanEvent::FieldClosed(Field::Subject, "outer".into()),
                ScanEvent::ObjectClosed(0..text.len()),
            ]
        );
    }

    #[test]
    fn test_wrapped_object() {
        let text = r#"{"email": {"subject": "Hi", "body": "Yo"}}"#;
        assert_eq!(
            scan(text),
            vec![
                ScanEvent::FieldClosed(Field::Subject, "Hi".into()),
                ScanEvent::FieldClosed(Field::Body, "Yo".into()),
                ScanEvent::ObjectClosed(0..text.len()),
            ]
        );
    }

    #[test]
    fn test_stray_brace_in_prose_is_abandoned() {
        let text = "Filling in {name: here\n```json\n{\"subject\": \"Hi\"}\n```";
        let start = text.rfind('{').unwrap();
        let end = text.rfind('}').unwrap() + 1;
        assert_eq!(
            scan(text),
            vec![
                ScanEvent::FieldClosed(Field::Subject, "Hi".into()),
                ScanEvent::ObjectClosed(start..end),
            ]
        );
    }

    #[test]
    fn test_broken_object_restarts_at_offending_brace() {
        let text = r#"{"hint" {"subject": "A"}"#;
        assert_eq!(
            scan(text),
            vec![
                ScanEvent::FieldClosed(Field::Subject, "A".into()),
                ScanEvent::ObjectClosed(8..text.len()),
            ]
        );
    }

    #[test]
    fn test_mismatched_close_is_abandoned() {
        let events = scan(r#"{"list": [1, 2}, "subject": "x"}"#);
        assert!(events.is_empty());
    }

    #[test]
    fn test_key_named_like_value_is_not_a_field() {
        let events = scan(r#"{"note": "subject", "x": "body"}"#);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ScanEvent::ObjectClosed(_)));
    }

    #[test]
    fn test_non_string_value_for_field() {
        let events = scan(r#"{"subject": 42, "body": "ok"}"#);
        assert_eq!(events[0], ScanEvent::FieldClosed(Field::Body, "ok".into()));
    }

    #[test]
    fn test_lone_surrogate_replaced_once() {
        let events = scan(r#"{"body": "a\ud83dz\ud83d"}"#);
        assert_eq!(
            events[0],
            ScanEvent::FieldClosed(Field::Body, "a\u{FFFD}z\u{FFFD}".into())
        );
    }

    #[test]
    fn test_invalid_unicode_escape() {
        let events = scan(r#"{"subject": "a\uZZ"}"#);
        assert_eq!(
            events[0],
            ScanEvent::FieldClosed(Field::Subject, "a\u{FFFD}ZZ".into())
        );
    }
}
