pub mod sse;

use serde::{Deserialize, Serialize};

/// Literal payload of the final frame of every successful stream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Body of `POST /api/chat`. Messages are in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// JSON payload carried by one SSE `data:` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content { content: String },
    Error { error: String },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { content: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { error: message.into() }
    }
}

/// Body of non-streaming error responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_events_serialize_as_single_field_objects() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::content("hi")).unwrap(),
            r#"{"content":"hi"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::error("boom")).unwrap(),
            r#"{"error":"boom"}"#
        );
    }

    #[test]
    fn roles_are_lowercase_on_the_wire() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":""}"#).is_err());
    }
}
