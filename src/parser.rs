//! Frame parsing and event classification.

use serde_json::Value;

use crate::client::ClientError;
use crate::model::Event;
use crate::options::DEFAULT_FRAME_PREFIX;

/// Turns one reassembled frame into an [`Event`].
#[derive(Debug, Clone)]
pub struct FrameParser {
    prefix: String,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_PREFIX)
    }
}

impl FrameParser {
    /// Create a parser that strips `prefix` from frames carrying it.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Trim the frame and strip exactly one occurrence of the framing prefix.
    ///
    /// Returns `None` for frames with nothing left to parse.
    ///
    /// # Example
    /// ```
    /// use askstream::parser::FrameParser;
    ///
    /// let parser = FrameParser::default();
    /// assert_eq!(parser.strip_prefix("data: {\"answer\":\"hi\"}\r"), Some("{\"answer\":\"hi\"}"));
    /// assert_eq!(parser.strip_prefix("{\"answer\":\"hi\"}"), Some("{\"answer\":\"hi\"}"));
    /// assert_eq!(parser.strip_prefix("   "), None);
    /// ```
    pub fn strip_prefix<'a>(&self, frame: &'a str) -> Option<&'a str> {
        let line = frame.trim();
        let body = match line.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.trim(),
            // "data:" with its trailing space trimmed away
            None if !self.prefix.is_empty() && line == self.prefix.trim_end() => "",
            None => line,
        };
        Some(body).filter(|b| !b.is_empty())
    }

    /// Parse and classify one frame.
    ///
    /// `Ok(None)` means the frame was blank and carries no event. Only a body
    /// that is not JSON at all yields [`ClientError::MalformedFrame`], which
    /// callers treat as recoverable. Fields of an unexpected type are read
    /// as absent.
    pub fn parse(&self, frame: &str) -> Result<Option<Event>, ClientError> {
        let Some(body) = self.strip_prefix(frame) else {
            return Ok(None);
        };

        let record: Value =
            serde_json::from_str(body).map_err(|e| ClientError::malformed_frame(body, e))?;

        Ok(Some(classify(&record)))
    }
}

/// Map a record to an event using its `type` discriminant.
fn classify(record: &Value) -> Event {
    match str_field(record, "type") {
        Some("end") => Event::End,
        Some("source") => {
            let body = str_field(record, "doc").unwrap_or_default().to_string();
            let title = record
                .get("metadata")
                .and_then(|m| str_field(m, "title"))
                .filter(|t| !t.is_empty())
                .map(|t| last_path_segment(t).to_string())
                .unwrap_or_else(|| body.clone());
            Event::Source { title, body }
        }
        Some("id") => Event::ConversationId {
            id: match record.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        },
        _ => Event::Token {
            text: str_field(record, "answer").unwrap_or_default().to_string(),
        },
    }
}

/// String value of `key`, or `None` when it is missing, not a string, or
/// `value` is not an object.
fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
