pub mod context;
pub mod controller;
pub mod events;
pub mod exchange;
pub mod message;
pub mod presenter;

pub use context::{ContextBinding, NavigationListener};
pub use controller::{ChatSession, SESSION_ID_KEY};
pub use events::{ExchangeEvent, ExchangeEventPayload, ExchangeFailure, FileSelected, PageChanged};
pub use message::{Message, Role, Transcript};
pub use presenter::{
    MarkdownRenderer, PlainTextRenderer, TerminalRenderer, TranscriptPrinter, TranscriptSnapshot,
};
