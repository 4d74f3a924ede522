use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use nanodash_backend::BackendConfig;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 18791;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const SETTINGS_DIRECTORY_NAME: &str = "nanodash";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const STATE_FILE_NAME: &str = "state.json";
pub const ENV_PREFIX: &str = "NANOBOT_DASHBOARD_";

/// Where the dashboard server lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token for the dashboard API.
    #[serde(default)]
    pub token: Option<String>,
    /// JSON file holding the resumable session id.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            token: None,
            state_file: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl DashboardSettings {
    fn normalized(mut self) -> Self {
        self.host = self.host.trim().to_string();
        if self.host.is_empty() {
            self.host = default_host();
        }
        self.token = self
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        self.state_file = self
            .state_file
            .filter(|path| !path.as_os_str().is_empty());
        self
    }

    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| SettingsStore::default_config_dir().join(STATE_FILE_NAME))
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(self.base_url());
        config.auth_token = self.token.clone();
        config.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        config
    }
}

pub struct SettingsStore;

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".nanodash"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Defaults, then the settings file, then `NANOBOT_DASHBOARD_*` variables.
    pub fn load() -> DashboardSettings {
        Self::load_from(&Self::default_config_path(), ENV_PREFIX)
    }

    /// Like [`SettingsStore::try_load`], falling back to defaults on error.
    pub fn load_from(path: &Path, env_prefix: &str) -> DashboardSettings {
        match Self::try_load(path, env_prefix) {
            Ok(settings) => {
                tracing::info!(path = ?path, base_url = %settings.base_url(), "loaded dashboard settings");
                settings
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to load dashboard settings, using defaults");
                DashboardSettings::default()
            }
        }
    }

    pub fn try_load(path: &Path, env_prefix: &str) -> Result<DashboardSettings, SettingsError> {
        let figment = Figment::from(Serialized::defaults(DashboardSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(env_prefix));

        let settings = figment
            .extract::<DashboardSettings>()
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })?
            .normalized();

        ensure!(
            settings.port != 0,
            InvalidPortSnafu {
                stage: "validate-settings",
            }
        );
        Ok(settings)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
    #[snafu(display("dashboard port must not be zero"))]
    InvalidPort { stage: &'static str },
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PREFIX: &str = "NANODASH_SETTINGS_TEST_UNSET_";

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            SettingsStore::try_load(&dir.path().join("settings.json"), TEST_PREFIX).unwrap();

        assert_eq!(settings, DashboardSettings::default());
        assert_eq!(settings.base_url(), "http://127.0.0.1:18791");
    }

    #[test]
    fn file_values_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "host": "  ", "port": 9000, "token": "  ", "connect_timeout_secs": 3 }"#,
        )
        .unwrap();

        let settings = SettingsStore::try_load(&path, TEST_PREFIX).unwrap();

        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.token, None);

        let backend = settings.to_backend_config();
        assert_eq!(backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(backend.auth_token, None);
        assert_eq!(backend.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn token_and_scheme_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "host": "https://bot.example.com/", "token": " secret " }"#,
        )
        .unwrap();

        let settings = SettingsStore::try_load(&path, TEST_PREFIX).unwrap();

        assert_eq!(settings.base_url(), "https://bot.example.com:18791");
        assert_eq!(
            settings.to_backend_config().auth_token.as_deref(),
            Some("secret")
        );
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "port": "not a number" "#).unwrap();

        assert!(SettingsStore::try_load(&path, TEST_PREFIX).is_err());
        assert_eq!(
            SettingsStore::load_from(&path, TEST_PREFIX),
            DashboardSettings::default()
        );
    }

    #[test]
    fn zero_port_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "port": 0 }"#).unwrap();

        assert!(matches!(
            SettingsStore::try_load(&path, TEST_PREFIX),
            Err(SettingsError::InvalidPort { .. })
        ));
    }

    #[test]
    fn explicit_state_file_wins() {
        let settings = DashboardSettings {
            state_file: Some(PathBuf::from("/tmp/nanodash-state.json")),
            ..DashboardSettings::default()
        };
        assert_eq!(
            settings.state_file_path(),
            PathBuf::from("/tmp/nanodash-state.json")
        );
    }
}
