//! Configuration: TOML file plus `BURSTBOT_`-prefixed environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the webhook server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Connection URL for the shared Redis instance (buffer + history).
    pub redis_url: String,

    /// Quiet period before a burst is considered complete. Fractional
    /// seconds are allowed.
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: f64,

    /// Expiry for unflushed buffer entries. Must exceed the quiet period so
    /// a crash mid-debounce does not lose data before a flush can happen.
    #[serde(default = "default_buffer_ttl_seconds")]
    pub buffer_ttl_seconds: u64,

    pub llm: LlmConfig,
    pub evolution: EvolutionConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Settings for the OpenAI-compatible answering endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

/// Settings for the Evolution API WhatsApp gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionConfig {
    pub base_url: String,
    pub instance: String,
    pub api_key: String,
}

/// Retention for per-session chat history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Number of user/assistant exchanges kept per session. Must be at
    /// least 1.
    #[serde(default = "default_history_max_turns")]
    pub max_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_history_ttl_seconds(),
            max_turns: default_history_max_turns(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("BURSTBOT").separator("__"))
            .build()
            .map_err(|error| Error::Config(error.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|error| Error::Config(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.debounce_seconds <= 0.0 {
            return Err(Error::Config("debounce_seconds must be positive".into()));
        }
        if (self.buffer_ttl_seconds as f64) <= self.debounce_seconds {
            return Err(Error::Config(
                "buffer_ttl_seconds must exceed debounce_seconds".into(),
            ));
        }
        // With zero turns LTRIM would keep the whole list instead of
        // nothing and the history key would grow unbounded.
        if self.history.max_turns == 0 {
            return Err(Error::Config(
                "history.max_turns must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_seconds)
    }

    pub fn buffer_ttl(&self) -> Duration {
        Duration::from_secs(self.buffer_ttl_seconds)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_debounce_seconds() -> f64 {
    5.0
}

fn default_buffer_ttl_seconds() -> u64 {
    300
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_system_prompt() -> String {
    "You are a helpful WhatsApp assistant. Answer concisely in the user's language.".to_string()
}

fn default_history_ttl_seconds() -> u64 {
    86_400
}

fn default_history_max_turns() -> usize {
    20
}
