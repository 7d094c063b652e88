//! Configuration settings for Lectern.

use crate::credentials::CredentialPool;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub pipeline: PipelineSettings,
    pub speech: SpeechSettings,
    pub search: SearchSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_base: String,
    /// Model used by the chunked pipelines.
    pub model: String,
    /// Cheaper model used for single-shot summaries and doubt clearing.
    pub light_model: String,
    pub temperature: f32,
    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,
    /// Environment variable holding comma-separated API keys.
    pub credentials_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.5-flash".to_string(),
            light_model: "gemini-2.5-flash-lite".to_string(),
            temperature: 0.7,
            request_timeout_secs: 120,
            credentials_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the credential pool from the configured environment variable.
    pub fn credential_pool(&self) -> crate::error::Result<CredentialPool> {
        let raw = std::env::var(&self.credentials_env).unwrap_or_default();
        CredentialPool::parse(&raw).map_err(|_| {
            crate::error::LecternError::Config(format!(
                "{} environment variable is not set or holds no keys. \
                 Set it to one or more comma-separated API keys.",
                self.credentials_env
            ))
        })
    }
}

/// Chunked pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum characters per chunk.
    pub max_chunk_chars: usize,
    /// Characters of rolling context embedded in follow-up prompts.
    pub context_chars: usize,
    /// Number of trailing turns that make up the rolling context.
    pub context_turns: usize,
    /// Base inter-chunk delay, divided by the credential pool size.
    pub throttle_base_ms: u64,
    /// Lower bound for the inter-chunk delay.
    pub throttle_floor_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: crate::text::DEFAULT_MAX_CHUNK_CHARS,
            context_chars: 500,
            context_turns: 2,
            throttle_base_ms: 2000,
            throttle_floor_ms: 500,
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Base URL of an OpenAI-compatible speech API.
    pub api_base: String,
    pub model: String,
    /// Voice for the first speaker (and for unrecognized labels).
    pub primary_voice: String,
    /// Voice for the second speaker.
    pub secondary_voice: String,
    /// Environment variable holding the speech API key.
    pub api_key_env: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "tts-1".to_string(),
            primary_voice: "onyx".to_string(),
            secondary_voice: "nova".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Image and video search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// YouTube Data API key. Falls back to the YOUTUBE_API_KEY environment variable.
    pub youtube_api_key: Option<String>,
    pub videos_per_topic: usize,
    pub images_per_topic: usize,
    pub wikimedia_api: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            videos_per_topic: 1,
            images_per_topic: 2,
            wikimedia_api: "https://commons.wikimedia.org/w/api.php".to_string(),
            user_agent: "lectern/0.1 (educational content generator)".to_string(),
            timeout_secs: 10,
        }
    }
}

impl SearchSettings {
    /// Resolve the YouTube key from config or environment.
    pub fn youtube_key(&self) -> Option<String> {
        self.youtube_api_key
            .clone()
            .or_else(|| std::env::var("YOUTUBE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectern")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}
