use nanodash_backend::{HistoryMessage, HistoryRole};

/// Counter bumped every time the transcript is reset or replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TranscriptGeneration(pub u64);

impl TranscriptGeneration {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Identifier for one send, unique for the lifetime of a session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Routing key for exchange events.
///
/// Captured when a message is sent; events carrying any other target are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeTarget {
    pub generation: TranscriptGeneration,
    pub exchange: ExchangeId,
}

impl ExchangeTarget {
    pub const fn new(generation: TranscriptGeneration, exchange: ExchangeId) -> Self {
        Self {
            generation,
            exchange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

/// One chat turn. `content` is opaque markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

impl From<HistoryMessage> for Message {
    fn from(message: HistoryMessage) -> Self {
        let role = match message.role {
            HistoryRole::User => Role::User,
            HistoryRole::Assistant => Role::Assistant,
        };
        Self {
            role,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}

/// Lifecycle of the exchange attached to the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Streaming(ExchangeTarget),
    Done(ExchangeTarget),
    Error {
        target: ExchangeTarget,
        message: String,
    },
    Cancelled(ExchangeTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeTransition {
    Start(ExchangeTarget),
    Complete(ExchangeTarget),
    Fail {
        target: ExchangeTarget,
        message: String,
    },
    Cancel(ExchangeTarget),
    ResetToIdle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeTransitionRejection {
    AlreadyStreaming {
        active: ExchangeTarget,
        attempted: ExchangeTarget,
    },
    NoActiveExchange,
    TargetMismatch {
        active: ExchangeTarget,
        attempted: ExchangeTarget,
    },
}

pub type ExchangeTransitionResult = Result<ExchangeState, ExchangeTransitionRejection>;

impl ExchangeState {
    pub fn active_target(&self) -> Option<ExchangeTarget> {
        match self {
            Self::Streaming(target) => Some(*target),
            Self::Idle | Self::Done(_) | Self::Error { .. } | Self::Cancelled(_) => None,
        }
    }

    pub fn accepts(&self, target: ExchangeTarget) -> bool {
        matches!(self, Self::Streaming(active) if *active == target)
    }

    /// Applies one transition.
    ///
    /// Any non-streaming state may start a new exchange; terminal transitions must name the
    /// active exchange exactly.
    pub fn apply(&self, transition: ExchangeTransition) -> ExchangeTransitionResult {
        match transition {
            ExchangeTransition::Start(target) => self.apply_start(target),
            ExchangeTransition::Complete(target) => {
                self.finish_active(target, ExchangeState::Done(target))
            }
            ExchangeTransition::Fail { target, message } => {
                self.finish_active(target, ExchangeState::Error { target, message })
            }
            ExchangeTransition::Cancel(target) => {
                self.finish_active(target, ExchangeState::Cancelled(target))
            }
            ExchangeTransition::ResetToIdle => Ok(Self::Idle),
        }
    }

    fn apply_start(&self, target: ExchangeTarget) -> ExchangeTransitionResult {
        match self {
            Self::Streaming(active) if *active != target => {
                Err(ExchangeTransitionRejection::AlreadyStreaming {
                    active: *active,
                    attempted: target,
                })
            }
            Self::Streaming(_) => Ok(self.clone()),
            Self::Idle | Self::Done(_) | Self::Error { .. } | Self::Cancelled(_) => {
                Ok(Self::Streaming(target))
            }
        }
    }

    fn finish_active(
        &self,
        target: ExchangeTarget,
        next: ExchangeState,
    ) -> ExchangeTransitionResult {
        match self {
            Self::Streaming(active) if *active == target => Ok(next),
            Self::Streaming(active) => Err(ExchangeTransitionRejection::TargetMismatch {
                active: *active,
                attempted: target,
            }),
            Self::Idle | Self::Done(_) | Self::Error { .. } | Self::Cancelled(_) => {
                Err(ExchangeTransitionRejection::NoActiveExchange)
            }
        }
    }
}

/// Ordered chat log for the active session plus the transient exchange status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    generation: TranscriptGeneration,
    exchange_state: ExchangeState,
    progress_text: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn generation(&self) -> TranscriptGeneration {
        self.generation
    }

    pub fn exchange_state(&self) -> &ExchangeState {
        &self.exchange_state
    }

    pub fn progress_text(&self) -> &str {
        &self.progress_text
    }

    /// True exactly while an exchange is streaming.
    pub fn is_sending(&self) -> bool {
        self.exchange_state.active_target().is_some()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn set_progress(&mut self, text: impl Into<String>) {
        self.progress_text = text.into();
    }

    pub fn clear_progress(&mut self) {
        self.progress_text.clear();
    }

    pub fn apply_exchange_transition(
        &mut self,
        transition: ExchangeTransition,
    ) -> ExchangeTransitionResult {
        let next_state = self.exchange_state.apply(transition)?;
        self.exchange_state = next_state.clone();
        Ok(next_state)
    }

    /// Swaps in a new message list, e.g. a fetched history.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.reset();
        self.messages = messages;
    }

    /// Drops every message and transient field and starts a new generation.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.progress_text.clear();
        self.exchange_state = ExchangeState::Idle;
        self.generation = self.generation.next();
    }
}
