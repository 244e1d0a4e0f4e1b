use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::memory::{DEFAULT_HISTORY_CAPACITY, DEFAULT_STYLE_CAPACITY};

pub const CONFIG_FILE_NAME: &str = "doppel_config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    // Telegram transport
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub allowed_chat_id: Option<i64>,

    // LLM configuration (OpenAI-compatible chat completions)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // Impersonated person
    #[serde(default = "default_target_username")]
    pub target_username: String,
    #[serde(default = "default_nicknames")]
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub persona_prompt: Option<String>,

    // Response policy and memory bounds
    #[serde(default = "default_response_chance")]
    pub response_chance: f64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_style_capacity")]
    pub style_capacity: usize,
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    300
}

fn default_temperature() -> f32 {
    1.0
}

fn default_target_username() -> String {
    "yersh9".to_string()
}

fn default_nicknames() -> Vec<String> {
    vec!["ерш".to_string(), "yersh".to_string()]
}

fn default_response_chance() -> f64 {
    0.3
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_style_capacity() -> usize {
    DEFAULT_STYLE_CAPACITY
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            allowed_chat_id: None,
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            llm_timeout_secs: default_llm_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            target_username: default_target_username(),
            nicknames: default_nicknames(),
            persona_prompt: None,
            response_chance: default_response_chance(),
            history_capacity: default_history_capacity(),
            style_capacity: default_style_capacity(),
        }
    }
}

impl BotConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Candidate config files, in lookup order
    pub fn config_paths() -> Vec<PathBuf> {
        vec![
            Self::get_base_dir().join(CONFIG_FILE_NAME),
            PathBuf::from(CONFIG_FILE_NAME),
        ]
    }

    /// Load config from doppel_config.toml (next to executable, then cwd),
    /// falling back to defaults. Environment variables win over both.
    pub fn load() -> Self {
        let from_file = Self::config_paths()
            .into_iter()
            .find_map(|path| match Self::load_from(&path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    if path.exists() {
                        tracing::error!("Failed to load {:?}: {:#}", path, e);
                    }
                    None
                }
            });

        let config = from_file.unwrap_or_else(|| {
            tracing::warn!("No config file found, using defaults + env vars");
            Self::default()
        });

        config.with_env_overrides().validated()
    }

    /// Parse a single TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str::<BotConfig>(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Apply environment variable overrides on top of the loaded values
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram_bot_token = Some(token);
        }

        if let Some(chat_id) = var("TELEGRAM_CHAT_ID") {
            match chat_id.parse() {
                Ok(id) => self.allowed_chat_id = Some(id),
                Err(_) => tracing::warn!("Ignoring invalid TELEGRAM_CHAT_ID {:?}", chat_id),
            }
        }

        if let Some(url) = var("LLM_API_URL") {
            self.llm_api_url = url;
        }

        if let Some(model) = var("LLM_MODEL") {
            self.llm_model = model;
        }

        if let Some(key) = var("OPENAI_API_KEY").or_else(|| var("LLM_API_KEY")) {
            self.llm_api_key = Some(key);
        }

        if let Some(timeout) = var("LLM_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse() {
                self.llm_timeout_secs = seconds;
            }
        }

        if let Some(target) = var("TARGET_USERNAME") {
            self.target_username = target;
        }

        if let Some(chance) = var("BOT_RESPONSE_CHANCE") {
            match chance.parse::<f64>() {
                Ok(value) if (0.0..=1.0).contains(&value) => self.response_chance = value,
                _ => tracing::warn!(
                    "Ignoring BOT_RESPONSE_CHANCE {:?} (expected a number from 0 to 1)",
                    chance
                ),
            }
        }

        self
    }

    /// Normalize values that would otherwise break invariants downstream
    pub fn validated(mut self) -> Self {
        self.target_username = self.target_username.trim().trim_start_matches('@').to_string();
        self.nicknames.retain(|nick| !nick.trim().is_empty());

        if !(0.0..=1.0).contains(&self.response_chance) {
            tracing::warn!(
                "response_chance {} is outside [0, 1], using {}",
                self.response_chance,
                default_response_chance()
            );
            self.response_chance = default_response_chance();
        }

        if self.history_capacity == 0 {
            self.history_capacity = default_history_capacity();
        }
        if self.style_capacity == 0 {
            self.style_capacity = default_style_capacity();
        }

        self
    }
}
