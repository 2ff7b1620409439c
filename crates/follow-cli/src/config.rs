//! Configuration: an optional TOML file overlaid with environment variables.
//!
//! Environment variables win over the file so a container can be configured
//! without shipping a config file at all.

use follow_core::{FollowError, FollowResult};
use follow_drive::{CredentialMode, DriveConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_CREDENTIALS_PATH: &str = "GOOGLE_CREDENTIALS_PATH";
pub const ENV_USE_SERVICE_ACCOUNT: &str = "USE_SERVICE_ACCOUNT";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";

#[derive(Debug, Deserialize)]
pub struct FollowConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default)]
    pub use_service_account: bool,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub drive: DriveConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            use_service_account: false,
            server: ServerConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl FollowConfig {
    /// Reads `path` if it exists, then applies process environment overrides.
    pub async fn load(path: &Path) -> FollowResult<Self> {
        let file = match tokio::fs::read_to_string(path).await {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Builds a config from optional TOML text and an environment lookup.
    pub fn from_sources(
        toml_text: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> FollowResult<Self> {
        let mut config = match toml_text {
            Some(text) => toml::from_str(text)
                .map_err(|e| FollowError::Config(format!("invalid config file: {e}")))?,
            None => Self::default(),
        };

        if let Some(path) = env(ENV_CREDENTIALS_PATH) {
            config.credentials_path = PathBuf::from(path);
        }
        if let Some(flag) = env(ENV_USE_SERVICE_ACCOUNT) {
            config.use_service_account = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Some(port) = env(ENV_PORT) {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|e| FollowError::Config(format!("invalid {ENV_PORT} '{port}': {e}")))?;
        }
        if let Some(host) = env(ENV_HOST) {
            config.server.host = host;
        }

        Ok(config)
    }

    pub fn credential_mode(&self) -> CredentialMode {
        CredentialMode::from_flag(self.use_service_account)
    }
}
