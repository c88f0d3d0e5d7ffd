//! Sidechat configuration module
//!
//! Handles loading configuration from `sidechat.toml`, with every field
//! defaulted from `config::constants` so a missing file yields a working
//! setup. Capability flags here replace the historical parallel copies of
//! the front-end script: streaming vs one-shot replies and multi-turn vs
//! single-turn context are configuration, not separate implementations.

pub mod api_keys;
pub mod constants;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use constants::{defaults, models, urls};

/// Chat model settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Chat completions endpoint (OpenAI-compatible)
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    /// Model id sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token; environment variables and the persisted store take
    /// precedence over this value
    #[serde(default)]
    pub api_key: Option<String>,

    /// Stream the reply incrementally instead of waiting for the full text
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Send the whole chat-channel history instead of only the current turn
    #[serde(default = "default_true")]
    pub multi_turn: bool,

    /// Overall request timeout for one-shot completions, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Max time to wait for the first streamed chunk, in seconds
    #[serde(default = "default_first_chunk_timeout")]
    pub first_chunk_timeout_secs: u64,

    /// Max time to wait between streamed chunks, in seconds
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            model: default_model(),
            api_key: None,
            streaming: default_true(),
            multi_turn: default_true(),
            request_timeout_secs: default_request_timeout(),
            first_chunk_timeout_secs: default_first_chunk_timeout(),
            chunk_timeout_secs: default_chunk_timeout(),
        }
    }
}

/// Weather skill settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    /// Forecast endpoint
    #[serde(default = "default_weather_endpoint")]
    pub endpoint: String,

    /// City assumed by the offline matcher when no city is recognized
    #[serde(default = "default_city")]
    pub default_city: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_weather_endpoint(),
            default_city: default_city(),
        }
    }
}

/// Translation skill settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    /// Translation endpoint
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    /// Endpoint-specific access key (not the chat bearer token)
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            api_key: None,
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path of the JSON store file; defaults to the platform data dir
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: None }
    }
}

/// Main configuration structure for sidechat
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SidechatConfig {
    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl SidechatConfig {
    /// Load configuration, searching the working directory and then the user
    /// config dir. A missing file is not an error; defaults apply.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::find_config_file() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        let user = dirs::config_dir()?
            .join(defaults::APP_DIR_NAME)
            .join(defaults::CONFIG_FILE_NAME);
        user.exists().then_some(user)
    }

    /// Resolve the store file path, honoring the config override
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(defaults::APP_DIR_NAME)
            .join(defaults::STORE_FILE_NAME)
    }
}

fn default_true() -> bool {
    true
}
fn default_chat_endpoint() -> String {
    urls::CHAT_COMPLETIONS_URL.to_string()
}
fn default_model() -> String {
    models::zhipu::DEFAULT_MODEL.to_string()
}
fn default_weather_endpoint() -> String {
    urls::WEATHER_API_URL.to_string()
}
fn default_translation_endpoint() -> String {
    urls::TRANSLATION_API_URL.to_string()
}
fn default_city() -> String {
    defaults::DEFAULT_CITY.to_string()
}
fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}
fn default_first_chunk_timeout() -> u64 {
    defaults::FIRST_CHUNK_TIMEOUT_SECS
}
fn default_chunk_timeout() -> u64 {
    defaults::CHUNK_TIMEOUT_SECS
}
