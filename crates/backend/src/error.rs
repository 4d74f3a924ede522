use snafu::Snafu;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("dashboard base URL is empty"))]
    MissingBaseUrl { stage: &'static str },
    #[snafu(display("dashboard base URL '{base_url}' is invalid: {message}"))]
    InvalidBaseUrl {
        stage: &'static str,
        base_url: String,
        message: String,
    },
    #[snafu(display("chat message is empty"))]
    EmptyMessage { stage: &'static str },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`: {source}"))]
    SendRequest {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned status {status} {reason}"))]
    UnexpectedStatus {
        stage: &'static str,
        endpoint: String,
        status: u16,
        reason: String,
        body: String,
    },
    #[snafu(display("failed to decode JSON from {endpoint} on `{stage}`: {source}"))]
    DecodeJson {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("response stream broke on `{stage}`: {message}"))]
    ReadBody {
        stage: &'static str,
        message: String,
    },
}

impl BackendError {
    /// HTTP status for failures the backend answered with a non-success code.
    pub fn status(&self) -> Option<(u16, &str)> {
        match self {
            Self::UnexpectedStatus { status, reason, .. } => Some((*status, reason.as_str())),
            _ => None,
        }
    }
}
