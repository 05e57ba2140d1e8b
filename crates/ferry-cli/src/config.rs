//! CLI configuration: an optional file layered under `FERRY_` environment
//! variables.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use ferry_migrate::{Credentials, HttpSettings, SecretString, GITHUB_API_URL};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// File read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "ferry.toml";

/// Configuration for the `ferry` binary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    /// Source server.
    pub bitbucket: BitbucketConfig,
    /// Target host.
    pub github: GitHubConfig,
    /// Downstream pipeline.
    pub pipeline: PipelineConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Logging.
    pub log: LogConfig,
}

/// Bitbucket Server connection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BitbucketConfig {
    /// Base URL, e.g. `https://bitbucket.example.com`.
    pub url: String,
    /// User for the REST API and for cloning.
    pub username: String,
    /// Password or HTTP access token.
    pub password: SecretString,
}

/// GitHub connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API base URL.
    pub api_url: String,
    /// Token used for the API and for pushing.
    pub token: SecretString,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            token: SecretString::default(),
        }
    }
}

/// Pipeline notification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// URL that receives the `repository_migrated` event.
    pub url: Option<String>,
}

/// HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = HttpSettings::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            user_agent: defaults.user_agent,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level used when neither `-v` nor `RUST_LOG` is given.
    pub level: String,
    /// Emit JSON log lines.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl FerryConfig {
    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] if present, then apply
    /// `FERRY_` variables (`FERRY_GITHUB__TOKEN`, `FERRY_HTTP__TIMEOUT_SECS`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path, true),
            None => Self::load_from(Path::new(DEFAULT_CONFIG_FILE), false),
        }
    }

    fn load_from(path: &Path, required: bool) -> Result<Self> {
        Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix("FERRY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Settings for every HTTP client.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone(),
        }
    }

    /// Credentials for the Bitbucket API and for cloning.
    pub fn source_credentials(&self) -> Credentials {
        Credentials::basic(self.bitbucket.username.clone(), self.bitbucket.password.clone())
    }

    /// Credentials for pushing to GitHub.
    pub fn target_credentials(&self) -> Credentials {
        Credentials::token(self.github.token.clone())
    }

    /// Fails unless everything a live migration needs is set.
    pub fn check_live(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.bitbucket.url.trim().is_empty() {
            missing.push("bitbucket.url");
        }
        if self.bitbucket.username.trim().is_empty() {
            missing.push("bitbucket.username");
        }
        if self.bitbucket.password.is_empty() {
            missing.push("bitbucket.password");
        }
        if self.github.token.is_empty() {
            missing.push("github.token");
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be greater than zero");
        }
        if !missing.is_empty() {
            bail!("missing configuration for a live migration: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = FerryConfig::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.http.user_agent.starts_with("ferry-migrate/"));
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
        assert!(config.pipeline.url.is_none());
    }

    #[test]
    fn test_load_toml() {
        let file = write_config(
            ".toml",
            r#"
[bitbucket]
url = "https://bitbucket.example.com"
username = "alice"
password = "secret"

[github]
token = "ghp_test"

[pipeline]
url = "https://ci.example.com/migrated"

[http]
timeout_secs = 5

[log]
level = "debug"
json = true
"#,
        );

        let config = FerryConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bitbucket.url, "https://bitbucket.example.com");
        assert_eq!(config.bitbucket.username, "alice");
        assert_eq!(config.bitbucket.password.expose(), "secret");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.token.expose(), "ghp_test");
        assert_eq!(
            config.pipeline.url.as_deref(),
            Some("https://ci.example.com/migrated")
        );
        assert_eq!(config.http_settings().timeout, Duration::from_secs(5));
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
        config.check_live().unwrap();
    }

    #[test]
    fn test_load_json() {
        let file = write_config(".json", r#"{ "github": { "api_url": "https://ghe.example.com/api/v3" } }"#);
        let config = FerryConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(FerryConfig::load(Some(&missing)).is_err());
        assert!(FerryConfig::load_from(&missing, false).is_ok());
    }

    #[test]
    fn test_check_live_lists_missing() {
        let err = FerryConfig::default().check_live().unwrap_err().to_string();
        assert!(err.contains("bitbucket.url"));
        assert!(err.contains("github.token"));
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let file = write_config(
            ".toml",
            "[bitbucket]\npassword = \"hunter2\"\n[github]\ntoken = \"ghp_secret\"\n",
        );
        let config = FerryConfig::load(Some(file.path())).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("ghp_secret"));
    }
}
