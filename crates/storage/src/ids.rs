use std::fmt;
use std::str::FromStr;

use snafu::ensure;

use super::error::{InvalidIdSnafu, StorageError, StorageResult};

/// Backend-issued conversation identity.
///
/// The value is opaque to the dashboard; only blank input is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim();
        ensure!(
            !trimmed.is_empty(),
            InvalidIdSnafu {
                stage: "parse-session-id",
                id_type: "session-id",
                raw: raw.to_string(),
            }
        );
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = StorageError;

    fn from_str(raw: &str) -> StorageResult<Self> {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let id = SessionId::parse("  dashboard_chat_1a2b3c4d \n").unwrap();
        assert_eq!(id.as_str(), "dashboard_chat_1a2b3c4d");
        assert_eq!(id.to_string(), "dashboard_chat_1a2b3c4d");
    }

    #[test]
    fn blank_ids_are_rejected() {
        for raw in ["", "   ", "\t\n"] {
            let error = SessionId::parse(raw).unwrap_err();
            assert!(matches!(error, StorageError::InvalidId { .. }), "{raw:?}");
        }
    }

    #[test]
    fn from_str_matches_parse() {
        let parsed: SessionId = "abc".parse().unwrap();
        assert_eq!(parsed, SessionId::parse("abc").unwrap());
    }
}
