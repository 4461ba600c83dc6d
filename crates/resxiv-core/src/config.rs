//! Configuration management for ResXiv.
//!
//! Loads configuration from ${RESXIV_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default base URL of the auth API.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/auth";

/// Environment variable overriding `[api] base_url`.
pub const API_URL_ENV: &str = "RESXIV_API_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for ResXiv configuration and data directories.
    //!
    //! RESXIV_HOME resolution order:
    //! 1. RESXIV_HOME environment variable (if set)
    //! 2. ~/.config/resxiv (default)
    //!
    //! The runtime directory holds session-scoped credentials and resolves
    //! from RESXIV_RUNTIME_DIR, falling back to `<tmp>/resxiv-session`.

    use std::path::PathBuf;

    const CREDENTIALS_FILE: &str = "credentials.json";

    /// Returns the ResXiv home directory.
    pub fn resxiv_home() -> PathBuf {
        if let Ok(home) = std::env::var("RESXIV_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("resxiv"))
            .unwrap_or_else(|| std::env::temp_dir().join("resxiv"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        resxiv_home().join("config.toml")
    }

    /// Returns the path of the "remember me" credential file.
    pub fn credentials_path() -> PathBuf {
        resxiv_home().join(CREDENTIALS_FILE)
    }

    /// Returns the directory for session-scoped state.
    pub fn runtime_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("RESXIV_RUNTIME_DIR") {
            return PathBuf::from(dir);
        }
        std::env::temp_dir().join("resxiv-session")
    }

    /// Returns the path of the session-scoped credential file.
    pub fn session_credentials_path() -> PathBuf {
        runtime_dir().join(CREDENTIALS_FILE)
    }

    /// Returns the log directory.
    pub fn logs_dir() -> PathBuf {
        resxiv_home().join("logs")
    }
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Used when the login command gets neither --remember nor --no-remember.
    pub remember_by_default: bool,
    /// Route reported after login when no redirect was requested.
    pub landing_route: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remember_by_default: false,
            landing_route: Config::DEFAULT_LANDING_ROUTE.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "warn" or "resxiv_core=debug".
    pub level: String,
    /// Write a log file under `$RESXIV_HOME/logs`.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub const DEFAULT_LANDING_ROUTE: &'static str = "/projects";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the commented default template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Resolves the API base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the selected URL does not parse.
    pub fn api_base_url(&self) -> Result<String> {
        resolve_base_url(self.api.base_url.as_deref(), API_URL_ENV, DEFAULT_API_URL)
    }

    /// Request timeout for the API client.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Picks the first non-empty candidate among env var, config value and default.
fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}
