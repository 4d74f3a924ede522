//! Dashboard chat backend: wire types, the `event:`/`data:` frame decoder and the HTTP client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod decoder;
pub mod error;
pub mod frame;
pub mod http;
pub mod stream;
pub mod types;

pub use decoder::{FrameDecoder, Utf8ChunkDecoder};
pub use error::{BackendError, BackendResult};
pub use frame::{ChatEvent, Frame};
pub use http::{BackendConfig, HttpBackend};
pub use stream::{FrameStream, decode_frames};
pub use types::{ChatContext, ChatRequest, HistoryMessage, HistoryRole};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Server side of a chat session.
pub trait ChatBackend: Send + Sync {
    /// Asks the server to mint a fresh session id.
    fn new_session<'a>(&'a self) -> BoxFuture<'a, BackendResult<String>>;
    /// Prior user/assistant turns of `session_id`, oldest first.
    fn history<'a>(&'a self, session_id: &'a str)
    -> BoxFuture<'a, BackendResult<Vec<HistoryMessage>>>;
    /// Sends one message and returns the decoded response stream.
    fn open_chat<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<FrameStream>>;
}

pub fn create_backend(config: BackendConfig) -> BackendResult<Arc<dyn ChatBackend>> {
    Ok(Arc::new(HttpBackend::new(config)?))
}
