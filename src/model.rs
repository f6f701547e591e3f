//! Data models for questions, wire records and the events handed to callers.

use serde::{Deserialize, Serialize};

/// One prior question/answer pair sent back to the server as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
}

impl Exchange {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

/// A question as the caller describes it.
///
/// Unset fields fall back to the client's [`AskOptions`](crate::options::AskOptions).
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    /// The question text
    pub question: String,

    /// Prior exchanges of this conversation, oldest first
    pub history: Vec<Exchange>,

    /// Server-assigned identifier of an existing conversation
    pub conversation_id: Option<String>,

    /// Knowledge scope override
    pub scope: Option<String>,

    /// Model selector override
    pub model: Option<String>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Exchange>) -> Self {
        self.history = history;
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: String) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }
}

/// Body of the streaming POST call, exactly as it goes over the wire.
///
/// `history` is a JSON document serialized into a string, and the access
/// credential doubles as the embeddings credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskBody {
    pub question: String,
    pub api_key: String,
    pub embeddings_key: String,
    pub active_docs: String,
    pub history: String,
    pub conversation_id: Option<String>,
    pub model: String,
    pub prompt_id: String,
    pub chunks: String,
}

/// Typed event produced from one classified frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Incremental fragment of the answer
    Token { text: String },

    /// Citation of a document the answer draws on
    Source { title: String, body: String },

    /// Server-assigned identifier of the exchange
    ConversationId { id: String },

    /// No further events follow
    End,

    /// The session failed; no further events follow
    Error { cause: String },
}

impl Event {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::End | Event::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(Event::Source {
            title: "setup.md".to_string(),
            body: "install steps".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "source");
        assert_eq!(json["title"], "setup.md");

        let json = serde_json::to_value(Event::End).unwrap();
        assert_eq!(json, serde_json::json!({"type": "end"}));
    }

    #[test]
    fn test_terminal_events() {
        assert!(Event::End.is_terminal());
        assert!(Event::Error { cause: "x".into() }.is_terminal());
        assert!(!Event::Token { text: "x".into() }.is_terminal());
    }
}
