use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("storage id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
    },
    #[snafu(display("failed to read state file at {path:?} on `{stage}`: {source}"))]
    ReadFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("state file at {path:?} is not a JSON object of strings: {source}"))]
    ParseFile {
        stage: &'static str,
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("failed to create state directory at {path:?} on `{stage}`: {source}"))]
    CreateDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize state on `{stage}`: {source}"))]
    SerializeState {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write state file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace state file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
