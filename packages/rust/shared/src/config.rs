//! Application configuration for octochat.
//!
//! User config lives at `~/.octochat/octochat.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OctochatError, Result};
use crate::retry::RetryPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "octochat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".octochat";

// ---------------------------------------------------------------------------
// Config structs (matching octochat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Knowledge-base extraction service.
    #[serde(default)]
    pub qnamaker: QnaMakerConfig,

    /// Bot platform settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Local response/status store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Retry budgets for each eventually-consistent step.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// `[qnamaker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QnaMakerConfig {
    /// Base URL of the knowledge-base API.
    #[serde(default = "default_qnamaker_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the subscription key (never store the key itself).
    #[serde(default = "default_qnamaker_key_env")]
    pub api_key_env: String,

    /// Per-request timeout.
    #[serde(default = "default_qnamaker_timeout")]
    pub timeout_secs: u64,
}

impl Default for QnaMakerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_qnamaker_endpoint(),
            api_key_env: default_qnamaker_key_env(),
            timeout_secs: default_qnamaker_timeout(),
        }
    }
}

fn default_qnamaker_endpoint() -> String {
    "https://westus.api.cognitive.microsoft.com/qnamaker/v2.0".into()
}
fn default_qnamaker_key_env() -> String {
    "QNAMAKER_API_KEY".into()
}
fn default_qnamaker_timeout() -> u64 {
    15
}

/// `[platform]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the model-building API.
    #[serde(default = "default_platform_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding a bearer token, if the endpoint wants one.
    #[serde(default)]
    pub auth_token_env: Option<String>,

    /// Alias bound to the published bot version.
    #[serde(default = "default_alias")]
    pub alias: String,

    /// Code hook invoked to fulfil every intent (the runtime responder).
    #[serde(default = "default_fulfillment_uri")]
    pub fulfillment_uri: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Per-request timeout.
    #[serde(default = "default_platform_timeout")]
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            endpoint: default_platform_endpoint(),
            auth_token_env: None,
            alias: default_alias(),
            fulfillment_uri: default_fulfillment_uri(),
            locale: default_locale(),
            voice_id: default_voice_id(),
            timeout_secs: default_platform_timeout(),
        }
    }
}

fn default_platform_endpoint() -> String {
    "https://models.lex.us-east-1.amazonaws.com".into()
}
fn default_alias() -> String {
    "DEV".into()
}
fn default_fulfillment_uri() -> String {
    "arn:aws:lambda:us-east-1:123456789012:function:LexResponder".into()
}
fn default_locale() -> String {
    "en-US".into()
}
fn default_voice_id() -> String {
    "Kendra".into()
}
fn default_platform_timeout() -> u64 {
    30
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the libSQL database file. A leading `~/` expands to the home dir.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.octochat/octochat.db".into()
}

/// One retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl RetrySettings {
    pub const fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
        }
    }

    /// Fixed-interval policy with the default classifier.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.interval_ms))
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Response table readiness polling.
    #[serde(default = "default_table_ready")]
    pub table_ready: RetrySettings,

    /// Create/update bot calls.
    #[serde(default = "default_create_bot")]
    pub create_bot: RetrySettings,

    /// Alias binding, which waits on the platform's asynchronous bot build.
    #[serde(default = "default_alias_retry")]
    pub alias: RetrySettings,

    /// Each teardown delete call.
    #[serde(default = "default_teardown")]
    pub teardown: RetrySettings,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            table_ready: default_table_ready(),
            create_bot: default_create_bot(),
            alias: default_alias_retry(),
            teardown: default_teardown(),
        }
    }
}

fn default_table_ready() -> RetrySettings {
    RetrySettings::new(20, 3_000)
}
fn default_create_bot() -> RetrySettings {
    RetrySettings::new(10, 10_000)
}
fn default_alias_retry() -> RetrySettings {
    RetrySettings::new(100, 3_000)
}
fn default_teardown() -> RetrySettings {
    RetrySettings::new(10, 2_000)
}

impl StoreConfig {
    /// Resolve `database_path`, expanding a leading `~/`.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match self.database_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    OctochatError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.database_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.octochat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OctochatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.octochat/octochat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OctochatError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OctochatError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OctochatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OctochatError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OctochatError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the knowledge-base subscription key from the env var named in config.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.qnamaker.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(OctochatError::config(format!(
            "knowledge-base API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Read the platform bearer token, if `auth_token_env` names one.
pub fn platform_auth_token(config: &AppConfig) -> Result<Option<String>> {
    let Some(var_name) = &config.platform.auth_token_env else {
        return Ok(None);
    };
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => Err(OctochatError::config(format!(
            "platform token not found. Set the {var_name} environment variable."
        ))),
    }
}
