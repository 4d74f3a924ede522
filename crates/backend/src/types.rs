use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dashboard context attached to a chat message when the operator is looking at a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    pub page: String,
    pub file: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            context: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// Wire-level speaker role, kept separate from the transcript's own role type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: HistoryRole,
    pub content: String,
    pub timestamp: Option<String>,
}

impl HistoryMessage {
    /// Reads one history entry, skipping anything that is not a user/assistant text turn.
    pub fn from_value(value: &Value) -> Option<Self> {
        let role = match value.get("role").and_then(Value::as_str)? {
            "user" => HistoryRole::User,
            "assistant" => HistoryRole::Assistant,
            _ => return None,
        };
        let content = value.get("content").and_then(Value::as_str)?.to_string();
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            role,
            content,
            timestamp,
        })
    }
}

impl HistoryResponse {
    pub(crate) fn into_messages(self) -> Vec<HistoryMessage> {
        self.messages
            .iter()
            .filter_map(HistoryMessage::from_value)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_omits_absent_fields() {
        let body = serde_json::to_value(ChatRequest::new("hello")).unwrap();
        assert_eq!(body, json!({ "message": "hello" }));

        let body = serde_json::to_value(
            ChatRequest::new("hello")
                .with_session_id("abc")
                .with_context(ChatContext {
                    page: "memory".to_string(),
                    file: "memory/MEMORY.md".to_string(),
                }),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({
                "message": "hello",
                "session_id": "abc",
                "context": { "page": "memory", "file": "memory/MEMORY.md" },
            })
        );
    }

    #[test]
    fn history_skips_foreign_roles_and_non_text_content() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "messages": [
                { "role": "user", "content": "hi", "timestamp": "2026-01-02T03:04:05" },
                { "role": "tool", "content": "ls output" },
                { "role": "assistant", "content": null },
                { "role": "assistant", "content": [{ "type": "text" }] },
                { "role": "assistant", "content": "hello", "timestamp": null },
            ]
        }))
        .unwrap();

        let messages = response.into_messages();
        assert_eq!(
            messages,
            vec![
                HistoryMessage {
                    role: HistoryRole::User,
                    content: "hi".to_string(),
                    timestamp: Some("2026-01-02T03:04:05".to_string()),
                },
                HistoryMessage {
                    role: HistoryRole::Assistant,
                    content: "hello".to_string(),
                    timestamp: None,
                },
            ]
        );
    }

    #[test]
    fn history_without_messages_field_is_empty() {
        let response: HistoryResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.into_messages().is_empty());
    }
}
