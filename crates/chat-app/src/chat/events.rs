use nanodash_backend::{BackendError, Frame};
use serde::Deserialize;

use crate::chat::message::ExchangeTarget;

/// Emitted when the dashboard file browser selects a file, or clears the selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FileSelected {
    #[serde(default)]
    pub path: Option<String>,
}

impl FileSelected {
    pub fn selected(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Emitted when the dashboard switches to another page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageChanged {
    pub page: String,
}

impl PageChanged {
    pub fn new(page: impl Into<String>) -> Self {
        Self { page: page.into() }
    }
}

/// Why an exchange ended without a reply from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeFailure {
    /// The chat endpoint answered with a non-success status.
    Status { status: u16, reason: String },
    /// The request or the response body failed below HTTP.
    Network(String),
    /// The server sent an `error` frame.
    Backend(String),
    /// The stream ended before a `done` or `error` frame.
    Interrupted,
}

impl ExchangeFailure {
    /// Text of the assistant bubble shown for this failure.
    pub fn render(&self) -> String {
        match self {
            Self::Status { status, reason } if reason.is_empty() => format!("Error: {status}"),
            Self::Status { status, reason } => format!("Error: {status} {reason}"),
            Self::Network(details) => format!("Network error: {details}"),
            Self::Backend(message) => format!("Error: {message}"),
            Self::Interrupted => "Error: connection closed before a reply arrived".to_string(),
        }
    }
}

impl From<&BackendError> for ExchangeFailure {
    fn from(error: &BackendError) -> Self {
        match error.status() {
            Some((status, reason)) => Self::Status {
                status,
                reason: reason.to_string(),
            },
            None => Self::Network(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEventPayload {
    Frame(Frame),
    Failed(ExchangeFailure),
    /// Transport end-of-stream.
    Closed,
}

/// Output of an exchange worker, tagged with the exchange it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeEvent {
    pub target: ExchangeTarget,
    pub payload: ExchangeEventPayload,
}

impl ExchangeEvent {
    pub fn new(target: ExchangeTarget, payload: ExchangeEventPayload) -> Self {
        Self { target, payload }
    }
}
