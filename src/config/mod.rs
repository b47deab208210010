//! Configuration management.
//!
//! Resolves where the persisted cache lives and loads the client settings
//! from `~/.aro/config.json`:
//! - **State**: one SQLite key-value file, `~/.aro/data/state.db` by default
//! - **Config**: API endpoint, debounce delay, retry policy, installation id

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sync::RetryPolicy;

/// Default API endpoint when neither config nor `ARO_API_URL` set one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Get the global Aro directory, `~/.aro/`.
#[must_use]
pub fn global_aro_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".aro"))
}

/// Check if test mode is enabled (`ARO_TEST_STATE` set to a truthy value).
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("ARO_TEST_STATE").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Isolated state file used in test mode.
#[must_use]
pub fn test_state_path() -> Option<PathBuf> {
    global_aro_dir().map(|dir| dir.join("test").join("state.db"))
}

/// Resolve the state file path.
///
/// Priority:
/// 1. `explicit_path` (the `--state` flag)
/// 2. `ARO_TEST_STATE` → `~/.aro/test/state.db`
/// 3. `ARO_STATE` environment variable
/// 4. `~/.aro/data/state.db`
#[must_use]
pub fn resolve_state_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_state_path();
    }

    if let Ok(path) = std::env::var("ARO_STATE") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    global_aro_dir().map(|dir| dir.join("data").join("state.db"))
}

/// Config file location: `ARO_CONFIG` or `~/.aro/config.json`.
///
/// # Errors
///
/// Returns `Error::Config` when no home directory can be determined.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ARO_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    global_aro_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Retry settings as stored in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl RetrySettings {
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_url: String,
    /// Quiet period before a debounced flush.
    pub debounce_secs: u64,
    /// Default number of points a plot is simplified to.
    pub plot_points: usize,
    pub retry: RetrySettings,
    /// Scopes the persisted cache key. Generated on first use.
    pub installation_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            debounce_secs: 10,
            plot_points: 100,
            retry: RetrySettings::default(),
            installation_id: None,
        }
    }
}

impl Config {
    /// Load from [`config_path`], falling back to defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load from `path`, falling back to defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
    }

    /// Save to [`config_path`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
    }

    /// API endpoint. `ARO_API_URL` wins over the config file.
    #[must_use]
    pub fn api_url(&self) -> String {
        if let Ok(url) = std::env::var("ARO_API_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        self.api_url.clone()
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    /// Return the installation id, generating one if absent.
    ///
    /// The second value is true when a new id was generated and the config
    /// should be saved.
    pub fn ensure_installation_id(&mut self) -> (String, bool) {
        if let Some(id) = &self.installation_id {
            return (id.clone(), false);
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.installation_id = Some(id.clone());
        (id, true)
    }
}
