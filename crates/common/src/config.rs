//! Application configuration.

use config::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use url::Url;

use crate::channels;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// REST backend configuration.
    pub api: ApiConfig,
    /// Cross-view synchronization configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// REST backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `http://localhost:8000`.
    pub base_url: Url,
    /// Identity attached to every mutating request as `X-User-Id`.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Optional request timeout in seconds. Unset means requests never time out.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Cross-view synchronization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Redis URL for cross-process notifications. In-process only when absent.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Topic name used for classification update events.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Capacity of the local broadcast buffer.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            channel: default_channel(),
            buffer: default_buffer(),
        }
    }
}

fn default_user_id() -> String {
    "dev".to_string()
}

fn default_channel() -> String {
    channels::CLASSIFICATION_UPDATES.to_string()
}

const fn default_buffer() -> usize {
    256
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, via `dotenvy`)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MASTERPLAN_ENV`)
    /// 4. Environment variables with `MASTERPLAN__` prefix
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_base_url(None)
    }

    /// Same as [`Config::load`], with `base_url` taking precedence over every
    /// layer when given.
    pub fn load_with_base_url(base_url: Option<&Url>) -> Result<Self, ConfigError> {
        // A missing .env file is the normal case outside development.
        let _ = dotenvy::dotenv();

        let env = std::env::var("MASTERPLAN_ENV").unwrap_or_else(|_| "development".to_string());
        debug!(env = %env, "Loading configuration");

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));

        Self::finish(builder, base_url)
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_file_with_base_url(path, None)
    }

    /// Same as [`Config::from_file`], with `base_url` taking precedence when given.
    pub fn from_file_with_base_url<P: AsRef<Path>>(
        path: P,
        base_url: Option<&Url>,
    ) -> Result<Self, ConfigError> {
        debug!(path = %path.as_ref().display(), "Loading configuration file");
        let builder = config::Config::builder().add_source(config::File::from(path.as_ref()));

        Self::finish(builder, base_url)
    }

    fn finish(
        builder: ConfigBuilder<DefaultState>,
        base_url: Option<&Url>,
    ) -> Result<Self, ConfigError> {
        let builder = builder.add_source(
            config::Environment::with_prefix("MASTERPLAN")
                .separator("__")
                .try_parsing(true),
        );
        let builder = match base_url {
            Some(url) => builder.set_override("api.base_url", url.as_str())?,
            None => builder,
        };

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_applies_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://localhost:8000\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.api.user_id, "dev");
        assert!(config.api.timeout_secs.is_none());
        assert!(config.sync.redis_url.is_none());
        assert_eq!(config.sync.channel, "classification-updates");
        assert_eq!(config.sync.buffer, 256);
    }

    #[test]
    fn test_from_file_reads_sync_section() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://plan.example.com\"\nuser_id = \"kim\"\ntimeout_secs = 15\n\n[sync]\nredis_url = \"redis://127.0.0.1:6379\"\nchannel = \"plan-updates\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.user_id, "kim");
        assert_eq!(config.api.timeout_secs, Some(15));
        assert_eq!(
            config.sync.redis_url.as_deref(),
            Some("redis://127.0.0.1:6379")
        );
        assert_eq!(config.sync.channel, "plan-updates");
    }

    #[test]
    fn test_from_file_requires_base_url() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nuser_id = \"kim\"").unwrap();

        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_base_url_override_keeps_other_settings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"http://localhost:8000\"\nuser_id = \"kim\"\n\n[sync]\nredis_url = \"redis://r:6379\""
        )
        .unwrap();
        let base_url = Url::parse("http://backend:9000/api").unwrap();

        let config = Config::from_file_with_base_url(file.path(), Some(&base_url)).unwrap();
        assert_eq!(config.api.base_url, base_url);
        assert_eq!(config.api.user_id, "kim");
        assert_eq!(config.sync.redis_url.as_deref(), Some("redis://r:6379"));
    }

    #[test]
    fn test_base_url_override_fills_missing_base_url() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nuser_id = \"kim\"").unwrap();
        let base_url = Url::parse("http://127.0.0.1:9000").unwrap();

        let config = Config::from_file_with_base_url(file.path(), Some(&base_url)).unwrap();
        assert_eq!(config.api.base_url, base_url);
        assert_eq!(config.api.user_id, "kim");
        assert_eq!(config.sync.channel, "classification-updates");
    }
}
