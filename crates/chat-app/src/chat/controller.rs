use std::sync::Arc;

use nanodash_backend::{ChatBackend, ChatEvent, ChatRequest};
use nanodash_storage::{KeyValueStore, SessionId};

use crate::chat::context::{ContextBinding, NavigationListener};
use crate::chat::events::{
    ExchangeEvent, ExchangeEventPayload, ExchangeFailure, FileSelected, PageChanged,
};
use crate::chat::exchange::ActiveExchange;
use crate::chat::message::{
    ExchangeId, ExchangeTarget, ExchangeTransition, Message, Transcript,
};
use crate::chat::presenter::TranscriptSnapshot;

/// Store key holding the id of the conversation to resume on the next start.
pub const SESSION_ID_KEY: &str = "chat_session_id";

/// Drives one chat conversation: session identity, sends, and transcript updates.
///
/// All transcript mutation happens through `&mut self`; exchange workers only produce
/// [`ExchangeEvent`]s, which are applied by [`ChatSession::apply_event`].
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn KeyValueStore>,
    transcript: Transcript,
    session_id: Option<SessionId>,
    history_loaded: bool,
    context: ContextBinding,
    next_exchange_id: u64,
    active: Option<ActiveExchange>,
}

impl ChatSession {
    /// Creates a controller, resuming the session id persisted in `store` if there is one.
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        let session_id = match store.get(SESSION_ID_KEY) {
            Ok(Some(raw)) => match SessionId::parse(&raw) {
                Ok(id) => Some(id),
                Err(error) => {
                    tracing::warn!(error = %error, "ignoring persisted chat session id");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read persisted chat session id");
                None
            }
        };

        if let Some(id) = &session_id {
            tracing::info!(session_id = %id, "resuming chat session");
        }

        Self {
            backend,
            store,
            transcript: Transcript::new(),
            session_id,
            history_loaded: false,
            context: ContextBinding::new(),
            next_exchange_id: 1,
            active: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn context(&self) -> &ContextBinding {
        &self.context
    }

    pub fn is_sending(&self) -> bool {
        self.transcript.is_sending()
    }

    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }

    /// Drops the file hint, as the dashboard's "clear context" control does.
    pub fn clear_context(&mut self) {
        self.context.clear();
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            generation: self.transcript.generation(),
            messages: self.transcript.messages().to_vec(),
            sending: self.transcript.is_sending(),
            progress_text: self.transcript.progress_text().to_string(),
            session_id: self.session_id.as_ref().map(|id| id.as_str().to_string()),
            context_file: self.context.file().map(str::to_string),
        }
    }

    /// Starts an exchange for `message`.
    ///
    /// Returns `false` without side effects when the message is blank or an exchange is already
    /// in flight. Must be called from within a tokio runtime.
    pub fn send(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }

        let target = ExchangeTarget::new(
            self.transcript.generation(),
            ExchangeId::new(self.next_exchange_id),
        );
        if let Err(rejection) = self
            .transcript
            .apply_exchange_transition(ExchangeTransition::Start(target))
        {
            tracing::debug!(exchange = ?target, rejection = ?rejection, "ignoring send while an exchange is in flight");
            return false;
        }
        self.next_exchange_id += 1;

        self.transcript.push(Message::user(message));
        self.transcript.clear_progress();

        let mut request = ChatRequest::new(message);
        if let Some(id) = &self.session_id {
            request = request.with_session_id(id.as_str());
        }
        if let Some(context) = self.context.hint() {
            request = request.with_context(context);
        }

        tracing::debug!(exchange = ?target, has_session = request.session_id.is_some(), "sending chat message");
        self.active = Some(ActiveExchange::spawn(self.backend.clone(), request, target));
        true
    }

    /// Waits for the next event of the in-flight exchange; `None` when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<ExchangeEvent> {
        let active = self.active.as_mut()?;
        Some(active.recv().await)
    }

    /// Applies one worker event. Events for any exchange other than the active one are
    /// discarded and `false` is returned.
    pub fn apply_event(&mut self, event: ExchangeEvent) -> bool {
        let target = event.target;
        if !self.transcript.exchange_state().accepts(target) {
            tracing::debug!(exchange = ?target, "discarding stale exchange event");
            return false;
        }

        match event.payload {
            ExchangeEventPayload::Frame(frame) => match ChatEvent::from_frame(&frame) {
                Some(ChatEvent::Progress { text }) => self.transcript.set_progress(text),
                Some(ChatEvent::Done {
                    session_id,
                    response,
                }) => {
                    if let Some(raw) = session_id {
                        self.adopt_session_id(&raw);
                    }
                    self.transcript.push(Message::assistant(response));
                    self.finish_exchange(ExchangeTransition::Complete(target));
                }
                Some(ChatEvent::Error { message }) => {
                    self.fail_exchange(target, ExchangeFailure::Backend(message));
                }
                None => {
                    tracing::debug!(exchange = ?target, event = %frame.event, "ignoring frame outside the chat protocol");
                }
            },
            ExchangeEventPayload::Failed(failure) => self.fail_exchange(target, failure),
            ExchangeEventPayload::Closed => {
                tracing::warn!(exchange = ?target, "chat stream closed before a terminal frame");
                self.fail_exchange(target, ExchangeFailure::Interrupted);
            }
        }
        true
    }

    /// Applies worker events until no exchange is in flight.
    pub async fn run_until_idle(&mut self) {
        while self.transcript.is_sending() {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.apply_event(event);
        }
    }

    pub async fn send_and_wait(&mut self, message: &str) -> bool {
        let sent = self.send(message);
        if sent {
            self.run_until_idle().await;
        }
        sent
    }

    /// Starts a fresh conversation.
    ///
    /// Any in-flight exchange is cancelled and the transcript and session id are cleared before
    /// the backend is asked for a new id. Returns whether a new id was adopted; on failure the
    /// id stays unset and the server assigns one with the next reply.
    pub async fn new_chat(&mut self) -> bool {
        self.cancel_active();
        self.transcript.reset();
        self.session_id = None;
        self.history_loaded = true;
        if let Err(error) = self.store.remove(SESSION_ID_KEY) {
            tracing::warn!(error = %error, "failed to forget persisted chat session id");
        }

        let raw = match self.backend.new_session().await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(error = %error, "failed to create a new chat session");
                return false;
            }
        };
        match SessionId::parse(&raw) {
            Ok(id) => {
                self.set_session_id(id);
                true
            }
            Err(error) => {
                tracing::warn!(error = %error, "backend returned an unusable session id");
                false
            }
        }
    }

    /// Replaces the transcript with the server's history for the current session.
    ///
    /// Runs at most once per controller lifetime and only when a session id is known and
    /// nothing is in flight. A failed fetch leaves the transcript empty and returns `false`.
    pub async fn load_history(&mut self) -> bool {
        if self.history_loaded {
            return false;
        }
        let Some(session_id) = self.session_id.clone() else {
            return false;
        };
        if self.transcript.is_sending() {
            tracing::debug!(session_id = %session_id, "deferring history load while an exchange is in flight");
            return false;
        }

        self.history_loaded = true;
        match self.backend.history(session_id.as_str()).await {
            Ok(messages) => {
                tracing::info!(session_id = %session_id, message_count = messages.len(), "loaded chat history");
                self.transcript
                    .replace_all(messages.into_iter().map(Message::from).collect());
                true
            }
            Err(error) => {
                tracing::warn!(session_id = %session_id, error = %error, "failed to load chat history");
                self.transcript.replace_all(Vec::new());
                false
            }
        }
    }

    /// Signals the in-flight worker to stop and moves the exchange to `Cancelled`.
    ///
    /// Returns `false` when nothing was in flight.
    fn cancel_active(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };
        let target = active.target();
        let delivered = active.cancel();
        tracing::debug!(exchange = ?target, delivered, "cancelling in-flight exchange");
        match self
            .transcript
            .apply_exchange_transition(ExchangeTransition::Cancel(target))
        {
            Ok(_) => {
                self.transcript.clear_progress();
                true
            }
            Err(rejection) => {
                tracing::warn!(exchange = ?target, rejection = ?rejection, "exchange cancel rejected");
                false
            }
        }
    }

    fn adopt_session_id(&mut self, raw: &str) {
        let Ok(id) = SessionId::parse(raw) else {
            return;
        };
        if self.session_id.as_ref() == Some(&id) {
            return;
        }
        self.set_session_id(id);
    }

    fn set_session_id(&mut self, id: SessionId) {
        tracing::info!(session_id = %id, "adopted chat session id");
        if let Err(error) = self.store.set(SESSION_ID_KEY, id.as_str()) {
            tracing::warn!(session_id = %id, error = %error, "failed to persist chat session id");
        }
        self.session_id = Some(id);
    }

    fn fail_exchange(&mut self, target: ExchangeTarget, failure: ExchangeFailure) {
        let message = failure.render();
        self.transcript.push(Message::assistant(message.clone()));
        self.finish_exchange(ExchangeTransition::Fail { target, message });
    }

    fn finish_exchange(&mut self, transition: ExchangeTransition) {
        if let Err(rejection) = self.transcript.apply_exchange_transition(transition) {
            tracing::warn!(rejection = ?rejection, "exchange transition rejected");
            let _ = self
                .transcript
                .apply_exchange_transition(ExchangeTransition::ResetToIdle);
        }
        self.transcript.clear_progress();
        self.active = None;
    }
}

impl NavigationListener for ChatSession {
    fn on_file_selected(&mut self, event: &FileSelected) {
        self.context.on_file_selected(event);
    }

    fn on_page_changed(&mut self, event: &PageChanged) {
        self.context.on_page_changed(event);
    }
}
