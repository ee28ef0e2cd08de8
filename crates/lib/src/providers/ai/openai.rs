use super::{api_error, AiProvider, GenerationParams};
use crate::errors::ChatError;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The Groq chat completions endpoint, which speaks the OpenAI wire format.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

// --- Provider implementation ---

/// A provider for Groq, OpenAI, or any OpenAI-compatible chat completions API.
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: Option<String>,
    params: GenerationParams,
}

impl OpenAiCompatibleProvider {
    /// Creates a new `OpenAiCompatibleProvider`.
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: Option<String>,
        params: GenerationParams,
    ) -> Result<Self, ChatError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ChatError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            params,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatibleProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ChatError> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            },
        ];

        let request_body = ChatCompletionRequest {
            messages,
            model: self.model.as_deref(),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            stream: false,
        };

        debug!(api_url = %self.api_url, model = ?self.model, "--> Sending chat completion request");

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ChatError::ModelInvocation(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(api_error("Chat completion", response).await);
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ChatError::ModelInvocation(format!("Failed to deserialize response: {e}"))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| ChatError::ModelInvocation("Response contained no choices".to_string()))
    }
}
