//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The state holds the `SqlChat` pipeline, which owns
//! the AI provider and the PostgreSQL pool and is shared by every handler.

use crate::config::{AppConfig, ModelConfig, PromptsConfig};
use datachat::{
    prompts::{
        sql::{SQL_GENERATION_SYSTEM_PROMPT, SQL_GENERATION_USER_PROMPT},
        PromptBuilder,
    },
    providers::{
        ai::{
            gemini::{gemini_api_url, GeminiProvider},
            openai::{OpenAiCompatibleProvider, DEFAULT_GROQ_MODEL, GROQ_API_URL},
            AiProvider, GenerationParams,
        },
        db::postgres::PostgresProvider,
    },
    SqlChat, SqlChatBuilder, INVOICE_SCHEMA,
};
use std::sync::Arc;
use tracing::{info, warn};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<SqlChat>,
}

impl AppState {
    pub fn new(chat: SqlChat) -> Self {
        Self {
            chat: Arc::new(chat),
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// The database is probed once; an unreachable database is logged but does not
/// stop the server, since each request acquires its own connection anyway.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let ai_provider = build_ai_provider(&config.model, &config.ai_api_key)?;
    info!(provider = %config.model.provider, "Initialized AI provider.");

    let storage = PostgresProvider::new(&config.database_url, config.db_pool_size)?;
    match storage.check_connection().await {
        Ok(()) => info!("Connected to PostgreSQL."),
        Err(e) => warn!("PostgreSQL is not reachable yet: {e}"),
    }

    let chat = SqlChatBuilder::new()
        .ai_provider(ai_provider)
        .storage_provider(Box::new(storage))
        .prompt_builder(build_prompt_builder(&config.prompts))
        .build()?;

    Ok(AppState::new(chat))
}

/// Instantiates the configured AI provider.
pub fn build_ai_provider(model: &ModelConfig, api_key: &str) -> anyhow::Result<Box<dyn AiProvider>> {
    let params = GenerationParams {
        temperature: model.temperature,
        max_tokens: model.max_tokens,
    };
    let provider: Box<dyn AiProvider> = match model.provider.as_str() {
        "groq" => Box::new(OpenAiCompatibleProvider::new(
            model.api_url.clone().unwrap_or_else(|| GROQ_API_URL.to_string()),
            Some(api_key.to_string()),
            Some(
                model
                    .model_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            ),
            params,
        )?),
        "openai" => {
            let model_name = model.model_name.clone().ok_or_else(|| {
                anyhow::anyhow!("model.model_name is required for the openai provider")
            })?;
            Box::new(OpenAiCompatibleProvider::new(
                model
                    .api_url
                    .clone()
                    .unwrap_or_else(|| OPENAI_API_URL.to_string()),
                Some(api_key.to_string()),
                Some(model_name),
                params,
            )?)
        }
        "gemini" => {
            let api_url = model.api_url.clone().unwrap_or_else(|| {
                gemini_api_url(model.model_name.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL))
            });
            Box::new(GeminiProvider::new(api_url, api_key.to_string(), params)?)
        }
        other => return Err(anyhow::anyhow!("Unsupported AI provider type '{other}'")),
    };
    Ok(provider)
}

fn build_prompt_builder(prompts: &PromptsConfig) -> PromptBuilder {
    if prompts.system_prompt.is_none() && prompts.user_prompt.is_none() {
        return PromptBuilder::default();
    }
    info!("Using prompt template overrides from configuration.");
    PromptBuilder::with_templates(
        &INVOICE_SCHEMA,
        prompts
            .system_prompt
            .as_deref()
            .unwrap_or(SQL_GENERATION_SYSTEM_PROMPT),
        prompts
            .user_prompt
            .as_deref()
            .unwrap_or(SQL_GENERATION_USER_PROMPT),
    )
}
