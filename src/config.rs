//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! all application settings into a single, structured configuration object.
//! Settings are loaded from environment variables (after `.env` is read by
//! `dotenvy`) and validated before the bot starts. A missing bot token or
//! completion API key is fatal.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default OpenAI-compatible chat completion endpoint
pub const DEFAULT_COMPLETION_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model requested from the completion endpoint
pub const DEFAULT_COMPLETION_MODEL: &str = "openai/gpt-4o-mini";

/// Default Google Translate TTS endpoint (the one gTTS talks to)
pub const DEFAULT_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Master administrator, always treated as admin
pub const DEFAULT_MASTER_ADMIN_ID: i64 = 5104062125;

/// Bot-specific configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
    /// Telegram id of the master administrator
    pub master_admin_id: i64,
    /// UI language used when the user's language is not supported
    pub default_language: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
            master_admin_id: DEFAULT_MASTER_ADMIN_ID,
            default_language: "ru".to_string(),
        }
    }
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        let parts: Vec<&str> = self.token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            ));
        }

        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config(
                "Bot token bot ID must be numeric".to_string(),
            ));
        }

        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "Bot token appears to be too short. Please verify it's a valid token".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 || self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if self.default_language.trim().is_empty() {
            return Err(AppError::Config(
                "Default language cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Completion API (LLM) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Bearer token for the completion endpoint
    pub api_key: String,
    /// Chat completion endpoint URL
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_COMPLETION_URL.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl CompletionConfig {
    /// Validate completion configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config(
                "Completion API key cannot be empty".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Completion endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }

        if self.model.trim().is_empty() {
            return Err(AppError::Config("Completion model cannot be empty".to_string()));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(AppError::Config(
                "Completion timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Storage configuration for the JSON state documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding users.json, user_settings.json, ...
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
        }
    }
}

/// Liveness listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the hosting platform probes
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 10000 }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.port == 0 {
            return Err(AppError::Config("Liveness port cannot be 0".to_string()));
        }
        Ok(())
    }
}

/// Reminder scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between two scans of the reminder store
    pub tick_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { tick_secs: 60 }
    }
}

impl ReminderConfig {
    /// Validate reminder configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.tick_secs == 0 || self.tick_secs > 60 {
            return Err(AppError::Config(
                "Reminder tick must be between 1 and 60 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Synthesis language (gTTS language code)
    pub language: String,
    /// Directory for per-user voice clips
    pub temp_dir: PathBuf,
    /// Synthesis endpoint
    pub endpoint: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "ru".to_string(),
            temp_dir: PathBuf::from("/tmp"),
            endpoint: DEFAULT_TTS_URL.to_string(),
        }
    }
}

impl SpeechConfig {
    /// Validate speech configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.language.trim().is_empty() {
            return Err(AppError::Config("TTS language cannot be empty".to_string()));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AppError::Config(format!(
                "TTS endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Bot configuration
    pub bot: BotConfig,
    /// Completion API configuration
    pub completion: CompletionConfig,
    /// State store configuration
    pub storage: StorageConfig,
    /// Liveness listener configuration
    pub server: ServerConfig,
    /// Reminder scheduler configuration
    pub reminders: ReminderConfig,
    /// Text-to-speech configuration
    pub speech: SpeechConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

/// Parse an optional environment variable, falling back to `default` when unset
fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

/// Read a required environment variable
fn env_required(key: &str) -> AppResult<String> {
    env::var(key)
        .map_err(|_| AppError::Config(format!("{} environment variable is required", key)))
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        config.bot.token = env_required("TELEGRAM_BOT_TOKEN")?;
        config.bot.http_timeout_secs = env_or("HTTP_CLIENT_TIMEOUT_SECS", 30)?;
        config.bot.master_admin_id = env_or("MASTER_ADMIN_ID", DEFAULT_MASTER_ADMIN_ID)?;
        config.bot.default_language = env_or("DEFAULT_LANGUAGE", "ru".to_string())?;

        config.completion.api_key = env_required("OPENROUTER_API_KEY")?;
        config.completion.endpoint =
            env_or("COMPLETION_API_URL", DEFAULT_COMPLETION_URL.to_string())?;
        config.completion.model =
            env_or("COMPLETION_MODEL", DEFAULT_COMPLETION_MODEL.to_string())?;
        config.completion.timeout_secs = env_or("COMPLETION_TIMEOUT_SECS", 30)?;

        config.storage.data_dir = env_or("DATA_DIR", PathBuf::from("."))?;

        config.server.port = env_or("PORT", 10000)?;

        config.reminders.tick_secs = env_or("REMINDER_TICK_SECS", 60)?;

        config.speech.language = env_or("TTS_LANGUAGE", "ru".to_string())?;
        config.speech.temp_dir = env_or("TTS_TEMP_DIR", PathBuf::from("/tmp"))?;
        config.speech.endpoint = env_or("TTS_API_URL", DEFAULT_TTS_URL.to_string())?;

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.completion.validate()?;
        self.server.validate()?;
        self.reminders.validate()?;
        self.speech.validate()?;
        self.observability.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], api_key=[REDACTED], model={}, data_dir={}, \
             port={}, reminder_tick_secs={}, tts_language={}",
            self.completion.model,
            self.storage.data_dir.display(),
            self.server.port,
            self.reminders.tick_secs,
            self.speech.language
        )
    }
}
