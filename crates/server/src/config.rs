//! # Application Configuration
//!
//! This module defines the configuration structure for the `datachat-server` and
//! the logic for loading it. Sources are layered, later ones winning:
//!
//! 1. built-in defaults (`serde` defaults on `AppConfig`),
//! 2. an optional YAML file: the path passed to `get_config`, else `DATACHAT_CONFIG`,
//!    else `config.yml` in the working directory,
//! 3. plain environment variables for top-level keys (`PORT`, `DATABASE_URL`, `AI_API_KEY`),
//! 4. `DATACHAT_`-prefixed variables for nested keys (e.g. `DATACHAT_MODEL__PROVIDER`).

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fmt, fs, path::Path, sync::LazyLock};
use tracing::info;

/// Names the file used when neither an override nor `DATACHAT_CONFIG` is given.
const DEFAULT_CONFIG_FILE: &str = "config.yml";

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap());

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
    /// A mandatory setting is absent or empty.
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Missing(key) => {
                write!(f, "{key} must be set in the environment or config file")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The PostgreSQL connection string. Loaded from `DATABASE_URL`.
    #[serde(default)]
    pub database_url: String,
    /// The model provider's API key. Loaded from `AI_API_KEY`, falling back to `GROQ_API_KEY`.
    #[serde(default)]
    pub ai_api_key: String,
    /// The maximum number of pooled database connections.
    #[serde(default = "default_db_pool_size")]
    pub db_pool_size: usize,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

fn default_port() -> u16 {
    8000
}

fn default_db_pool_size() -> usize {
    16
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("ai_api_key", &"<redacted>")
            .field("db_pool_size", &self.db_pool_size)
            .field("model", &self.model)
            .field("prompts", &self.prompts)
            .finish()
    }
}

/// Which model to call and how.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// One of `groq`, `openai` or `gemini`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_temperature() -> f32 {
    0.05
}

fn default_max_tokens() -> u32 {
    800
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: None,
            model_name: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Optional replacements for the SQL generation prompt templates.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptsConfig {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
}

// Reads a file and substitutes `${VAR}` references with environment values.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let expanded = ENV_VAR_RE.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded.into_owned()))
}

/// Removes one pair of matching surrounding quotes, as left by some `.env` writers.
pub fn strip_quotes(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Loads the application configuration from an optional file and the environment.
///
/// Fails when `DATABASE_URL` or the AI API key is missing, or when a prompt
/// override is present but empty.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let explicit_path = config_path_override
        .map(str::to_string)
        .or_else(|| env::var("DATACHAT_CONFIG").ok().filter(|p| !p.is_empty()));

    match explicit_path {
        Some(path) => {
            let content = read_and_substitute(&path)?.ok_or_else(|| {
                ConfigError::NotFound(format!("Config file not found at '{path}'."))
            })?;
            info!("Loading configuration from '{path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None => {
            if let Some(content) = read_and_substitute(DEFAULT_CONFIG_FILE)? {
                info!("Loading configuration from '{DEFAULT_CONFIG_FILE}'.");
                builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
            }
        }
    }

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("DATACHAT")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    if config.ai_api_key.trim().is_empty() {
        if let Ok(key) = env::var("GROQ_API_KEY") {
            config.ai_api_key = key;
        }
    }
    config.ai_api_key = strip_quotes(&config.ai_api_key);
    config.database_url = strip_quotes(&config.database_url);

    if config.database_url.is_empty() {
        return Err(ConfigError::Missing("DATABASE_URL"));
    }
    if config.ai_api_key.is_empty() {
        return Err(ConfigError::Missing("AI_API_KEY"));
    }
    for (name, template) in [
        ("prompts.system_prompt", &config.prompts.system_prompt),
        ("prompts.user_prompt", &config.prompts.user_prompt),
    ] {
        if template.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::General(format!("{name} must not be empty")));
        }
    }

    Ok(config)
}
