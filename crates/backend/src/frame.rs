use serde_json::Value;

pub const PROGRESS_EVENT: &str = "progress";
pub const DONE_EVENT: &str = "done";
pub const ERROR_EVENT: &str = "error";

/// One decoded `event:`/`data:` pair from the chat response stream.
///
/// `payload` always holds successfully parsed JSON; `event` is whatever name preceded the data
/// line and may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub payload: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }
}

/// Typed reading of the three frame kinds the chat endpoint emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Progress {
        text: String,
    },
    Done {
        session_id: Option<String>,
        response: String,
    },
    Error {
        message: String,
    },
}

impl ChatEvent {
    /// Returns `None` for event names outside the chat protocol.
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        let event = match frame.event.as_str() {
            PROGRESS_EVENT => Self::Progress {
                text: frame.str_field("text").unwrap_or_default().to_string(),
            },
            DONE_EVENT => Self::Done {
                session_id: frame
                    .str_field("session_id")
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
                response: frame.str_field("response").unwrap_or_default().to_string(),
            },
            ERROR_EVENT => Self::Error {
                message: match frame.payload.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    Some(Value::Null) | None => "unknown error".to_string(),
                    Some(other) => other.to_string(),
                },
            },
            _ => return None,
        };
        Some(event)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_defaults_to_empty_text() {
        let event = ChatEvent::from_frame(&Frame::new("progress", json!({}))).unwrap();
        assert_eq!(
            event,
            ChatEvent::Progress {
                text: String::new()
            }
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn done_reads_session_and_response() {
        let event = ChatEvent::from_frame(&Frame::new(
            "done",
            json!({ "response": "hi", "session_id": "abc" }),
        ))
        .unwrap();
        assert_eq!(
            event,
            ChatEvent::Done {
                session_id: Some("abc".to_string()),
                response: "hi".to_string(),
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn done_treats_blank_session_as_absent() {
        let event =
            ChatEvent::from_frame(&Frame::new("done", json!({ "session_id": "  " }))).unwrap();
        assert_eq!(
            event,
            ChatEvent::Done {
                session_id: None,
                response: String::new(),
            }
        );
    }

    #[test]
    fn error_message_falls_back_for_missing_or_foreign_values() {
        let missing = ChatEvent::from_frame(&Frame::new("error", json!({}))).unwrap();
        assert_eq!(
            missing,
            ChatEvent::Error {
                message: "unknown error".to_string()
            }
        );

        let numeric = ChatEvent::from_frame(&Frame::new("error", json!({ "message": 504 }))).unwrap();
        assert_eq!(
            numeric,
            ChatEvent::Error {
                message: "504".to_string()
            }
        );
    }

    #[test]
    fn unknown_and_unnamed_events_are_not_chat_events() {
        assert_eq!(ChatEvent::from_frame(&Frame::new("", json!({ "text": "x" }))), None);
        assert_eq!(ChatEvent::from_frame(&Frame::new("ping", json!({}))), None);
    }
}
