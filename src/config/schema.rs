//! Configuration schema definitions for nyrkio-reporter.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── NyrkioConfig   - Project identity, collector endpoints, timeouts
//! └── GitConfig      - Where the checkout lives, optional branch override
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// # TOML Structure
///
/// ```toml
/// [nyrkio]
/// project_name = "MyApp"
/// git_repo = "https://github.com/org/my-app"
///
/// [git]
/// working_dir = "."
/// ```
///
/// # Example
///
/// ```
/// use nyrkio_reporter::config::Config;
///
/// let config: Config = toml::from_str(r#"
///     [nyrkio]
///     project_name = "MyApp"
///     git_repo = "https://github.com/org/my-app"
/// "#).unwrap();
///
/// assert_eq!(config.nyrkio.api_url, "https://nyrkio.com");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Reporter settings.
    pub nyrkio: NyrkioConfig,

    /// Source-control settings (optional, has defaults).
    #[serde(default)]
    pub git: GitConfig,
}

/// Reporter settings.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `api_url` | `https://nyrkio.com` |
/// | `site_url` | `https://nyrkio.com` |
/// | `token_env` | `NYRKIO_TOKEN` |
/// | `request_timeout_secs` | 30 |
/// | `flush_deadline_secs` | 300 |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NyrkioConfig {
    /// Outermost segment of every result path.
    pub project_name: String,

    /// Repository URL recorded in each result's attributes.
    pub git_repo: String,

    /// Base URL of the collector API. Results are posted to
    /// `{api_url}/api/v0/result/{path}`.
    #[serde(default = "default_url")]
    pub api_url: String,

    /// Base URL of the web UI, used for the links printed after submission.
    #[serde(default = "default_url")]
    pub site_url: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Timeout for a single submission request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on the whole submission phase. Records still unsent
    /// when it passes are reported as failures.
    #[serde(default = "default_flush_deadline")]
    pub flush_deadline_secs: u64,
}

impl NyrkioConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn flush_deadline(&self) -> Duration {
        Duration::from_secs(self.flush_deadline_secs)
    }
}

fn default_url() -> String {
    "https://nyrkio.com".to_string()
}

fn default_token_env() -> String {
    "NYRKIO_TOKEN".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_flush_deadline() -> u64 {
    300
}

/// Source-control settings.
///
/// ```toml
/// [git]
/// working_dir = "/path/to/checkout"
/// branch = "main"   # CI runners often check out a detached HEAD
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GitConfig {
    /// Checkout to read commit information from. Defaults to the
    /// current directory.
    pub working_dir: Option<PathBuf>,

    /// Branch name to report instead of asking git.
    pub branch: Option<String>,
}

/// Reasons a configuration is rejected by [`Config::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("nyrkio.project_name must not be empty")]
    EmptyProjectName,

    #[error("nyrkio.git_repo must not be empty")]
    EmptyGitRepo,

    #[error("nyrkio.{field} must be an http(s) URL, got '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("nyrkio.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

impl Config {
    /// Checks the values serde can't.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.nyrkio;

        if n.project_name.trim().is_empty() {
            return Err(ConfigError::EmptyProjectName);
        }
        if n.git_repo.trim().is_empty() {
            return Err(ConfigError::EmptyGitRepo);
        }
        for (field, value) in [("api_url", &n.api_url), ("site_url", &n.site_url)] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    field,
                    value: value.clone(),
                });
            }
        }
        if n.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("request_timeout_secs"));
        }
        if n.flush_deadline_secs == 0 {
            return Err(ConfigError::ZeroTimeout("flush_deadline_secs"));
        }

        Ok(())
    }
}
