use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use snafu::{ResultExt, ensure};

use crate::error::{
    BackendResult, BuildClientSnafu, DecodeJsonSnafu, EmptyMessageSnafu, InvalidBaseUrlSnafu,
    MissingBaseUrlSnafu, SendRequestSnafu, UnexpectedStatusSnafu,
};
use crate::stream::{FrameStream, decode_frames};
use crate::types::{ChatRequest, HistoryMessage, HistoryResponse, NewSessionResponse};
use crate::{BoxFuture, ChatBackend};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Scheme, host and port of the dashboard server, e.g. `http://127.0.0.1:18791`.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` on every request when present.
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Dashboard chat endpoints over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let raw_base_url = config.base_url.trim();
        ensure!(
            !raw_base_url.is_empty(),
            MissingBaseUrlSnafu {
                stage: "http-backend-new",
            }
        );
        let base_url = Url::parse(raw_base_url).map_err(|error| {
            InvalidBaseUrlSnafu {
                stage: "parse-base-url",
                base_url: raw_base_url,
                message: error.to_string(),
            }
            .build()
        })?;
        ensure!(
            !base_url.cannot_be_a_base(),
            InvalidBaseUrlSnafu {
                stage: "parse-base-url",
                base_url: raw_base_url,
                message: "URL cannot carry a path",
            }
        );

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-client",
            })?;

        let auth_token = config
            .auth_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        stage: &'static str,
    ) -> BackendResult<Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .context(SendRequestSnafu { stage, endpoint })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        UnexpectedStatusSnafu {
            stage,
            endpoint,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default(),
            body,
        }
        .fail()
    }

    pub async fn create_session(&self) -> BackendResult<String> {
        let endpoint = self.endpoint(&["api", "chat", "new"]);
        let response = self
            .send(self.client.post(&endpoint), &endpoint, "create-session")
            .await?;
        let payload: NewSessionResponse =
            response.json().await.context(DecodeJsonSnafu {
                stage: "decode-new-session",
                endpoint: &endpoint,
            })?;

        tracing::info!(session_id = %payload.session_id, "backend issued a new chat session");
        Ok(payload.session_id)
    }

    pub async fn fetch_history(&self, session_id: &str) -> BackendResult<Vec<HistoryMessage>> {
        let endpoint = self.endpoint(&["api", "chat", session_id, "history"]);
        let response = self
            .send(self.client.get(&endpoint), &endpoint, "fetch-history")
            .await?;
        let payload: HistoryResponse = response.json().await.context(DecodeJsonSnafu {
            stage: "decode-history",
            endpoint: &endpoint,
        })?;

        let messages = payload.into_messages();
        tracing::debug!(session_id, message_count = messages.len(), "fetched chat history");
        Ok(messages)
    }

    pub async fn open_chat_stream(&self, request: ChatRequest) -> BackendResult<FrameStream> {
        ensure!(
            !request.message.trim().is_empty(),
            EmptyMessageSnafu {
                stage: "open-chat-stream",
            }
        );

        let endpoint = self.endpoint(&["api", "chat"]);
        let response = self
            .send(
                self.client.post(&endpoint).json(&request),
                &endpoint,
                "open-chat-stream",
            )
            .await?;

        tracing::debug!(
            session_id = ?request.session_id,
            has_context = request.context.is_some(),
            "chat stream opened"
        );
        Ok(decode_frames(response.bytes_stream()))
    }
}

impl ChatBackend for HttpBackend {
    fn new_session<'a>(&'a self) -> BoxFuture<'a, BackendResult<String>> {
        Box::pin(self.create_session())
    }

    fn history<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, BackendResult<Vec<HistoryMessage>>> {
        Box::pin(self.fetch_history(session_id))
    }

    fn open_chat<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<FrameStream>> {
        Box::pin(self.open_chat_stream(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[test]
    fn base_url_is_trimmed() {
        let backend = HttpBackend::new(BackendConfig::new(" http://127.0.0.1:18791/ ")).unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:18791");
        assert_eq!(
            backend.endpoint(&["api", "chat"]),
            "http://127.0.0.1:18791/api/chat"
        );
    }

    #[test]
    fn session_id_is_a_single_path_segment() {
        let backend = HttpBackend::new(BackendConfig::new("http://localhost:18791/dash/")).unwrap();
        assert_eq!(
            backend.endpoint(&["api", "chat", "a/b?c#d", "history"]),
            "http://localhost:18791/dash/api/chat/a%2Fb%3Fc%23d/history"
        );
        assert_eq!(
            backend.endpoint(&["api", "chat", "dashboard_chat_1a2b3c4d", "history"]),
            "http://localhost:18791/dash/api/chat/dashboard_chat_1a2b3c4d/history"
        );
    }

    #[test]
    fn unparsable_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::new(BackendConfig::new("127.0.0.1:18791")),
            Err(BackendError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            HttpBackend::new(BackendConfig::new("not a url")),
            Err(BackendError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn blank_base_url_is_rejected() {
        let result = HttpBackend::new(BackendConfig::new("   "));
        assert!(matches!(result, Err(BackendError::MissingBaseUrl { .. })));
    }

    #[test]
    fn blank_token_is_not_sent() {
        let backend =
            HttpBackend::new(BackendConfig::new("http://localhost").with_auth_token("  ")).unwrap();
        assert!(backend.auth_token.is_none());
    }

    #[tokio::test]
    async fn empty_message_never_reaches_the_network() {
        let backend = HttpBackend::new(BackendConfig::new("http://127.0.0.1:9")).unwrap();
        let result = backend.open_chat_stream(ChatRequest::new("  \n")).await;
        assert!(matches!(result, Err(BackendError::EmptyMessage { .. })));
    }
}
