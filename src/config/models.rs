use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Key value shipped in the sample `.env`; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your_actual_gemini_api_key_here";

const CONFIG_ENV_VAR: &str = "STUDYPLAN_CONFIG";
const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
const DEFAULT_CONFIG_FILE: &str = "studyplan.toml";

/// Sampling parameters for one kind of generative call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl GenerationParams {
    pub fn schedule() -> Self {
        GenerationParams {
            temperature: 0.3,
            max_output_tokens: 3000,
            response_mime_type: "application/json".to_string(),
        }
    }

    pub fn quiz() -> Self {
        GenerationParams {
            temperature: 0.7,
            max_output_tokens: 2000,
            response_mime_type: "application/json".to_string(),
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::schedule()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `base * attempt`
    Linear,
    /// `base * 2^(attempt - 1)`
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub strategy: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            strategy: BackoffStrategy::Linear,
        }
    }
}

/// Read-only engine configuration, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    pub schedule_params: GenerationParams,
    pub quiz_params: GenerationParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            model: "gemini-2.0-flash-exp".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            request_timeout_secs: 60,
            retry: RetryConfig::default(),
            schedule_params: GenerationParams::schedule(),
            quiz_params: GenerationParams::quiz(),
        }
    }
}

impl EngineConfig {
    /// True when a usable credential is present
    pub fn has_api_key(&self) -> bool {
        is_usable_api_key(self.api_key.as_deref())
    }

    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

pub fn is_usable_api_key(key: Option<&str>) -> bool {
    match key.map(str::trim) {
        Some(k) => !k.is_empty() && k != PLACEHOLDER_API_KEY,
        None => false,
    }
}

fn get_config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

fn load_from_path(path: &Path) -> EngineConfig {
    match fs::read_to_string(path) {
        Ok(content) => match EngineConfig::from_toml_str(&content) {
            Ok(config) => {
                tracing::info!(path = ?path, "Loaded engine config");
                config
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to parse config, using defaults");
                EngineConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = ?path, "No config file, using defaults");
            EngineConfig::default()
        }
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Failed to read config, using defaults");
            EngineConfig::default()
        }
    }
}

/// Load the engine config from `STUDYPLAN_CONFIG` (or `./studyplan.toml`),
/// then let `GEMINI_API_KEY` override the credential.
pub fn load_engine_config() -> EngineConfig {
    let mut config = load_from_path(&get_config_path());

    if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
        config.api_key = Some(key);
    }

    if !config.has_api_key() {
        tracing::error!(
            "GEMINI_API_KEY is not set; schedules will use local fallback generation"
        );
    }

    config
}
