use std::sync::Arc;

use futures::StreamExt;
use nanodash_backend::{ChatBackend, ChatEvent, ChatRequest};
use tokio::sync::{mpsc, oneshot};

use crate::chat::events::{ExchangeEvent, ExchangeEventPayload, ExchangeFailure};
use crate::chat::message::ExchangeTarget;

/// Handle to the worker streaming one exchange.
///
/// Dropping the handle cancels the worker, which then drops the response stream and releases
/// the connection.
pub struct ActiveExchange {
    target: ExchangeTarget,
    events: mpsc::UnboundedReceiver<ExchangeEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl ActiveExchange {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(
        backend: Arc<dyn ChatBackend>,
        request: ChatRequest,
        target: ExchangeTarget,
    ) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(run_exchange_worker(
            backend, request, target, event_tx, cancel_rx,
        ));

        Self {
            target,
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub fn target(&self) -> ExchangeTarget {
        self.target
    }

    /// Next worker event. A worker that exits without a terminal event reads as `Closed`.
    pub async fn recv(&mut self) -> ExchangeEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => ExchangeEvent::new(self.target, ExchangeEventPayload::Closed),
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for ActiveExchange {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

async fn run_exchange_worker(
    backend: Arc<dyn ChatBackend>,
    request: ChatRequest,
    target: ExchangeTarget,
    event_tx: mpsc::UnboundedSender<ExchangeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let opened = tokio::select! {
        _ = &mut cancel_rx => {
            tracing::debug!(exchange = ?target, "exchange cancelled before the stream opened");
            return;
        }
        opened = backend.open_chat(request) => opened,
    };

    let mut frames = match opened {
        Ok(frames) => frames,
        Err(error) => {
            tracing::warn!(exchange = ?target, error = %error, "failed to open chat stream");
            let failure = ExchangeFailure::from(&error);
            let _ = event_tx.send(ExchangeEvent::new(
                target,
                ExchangeEventPayload::Failed(failure),
            ));
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!(exchange = ?target, "exchange cancelled");
                return;
            }
            next_frame = frames.next() => {
                match next_frame {
                    Some(Ok(frame)) => {
                        let terminal = ChatEvent::from_frame(&frame)
                            .is_some_and(|event| event.is_terminal());
                        let event = ExchangeEvent::new(target, ExchangeEventPayload::Frame(frame));
                        if event_tx.send(event).is_err() || terminal {
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        tracing::warn!(exchange = ?target, error = %error, "chat stream broke");
                        let failure = ExchangeFailure::from(&error);
                        let _ = event_tx.send(ExchangeEvent::new(
                            target,
                            ExchangeEventPayload::Failed(failure),
                        ));
                        return;
                    }
                    None => {
                        let _ = event_tx.send(ExchangeEvent::new(target, ExchangeEventPayload::Closed));
                        return;
                    }
                }
            }
        }
    }
}
