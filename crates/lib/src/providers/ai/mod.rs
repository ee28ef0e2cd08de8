pub mod gemini;
pub mod openai;

use crate::errors::ChatError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// Decoding parameters sent with every completion request.
///
/// SQL generation wants determinism over variety, so the temperature stays near
/// zero, and the token cap stops a runaway completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.05,
            max_tokens: 800,
        }
    }
}

/// A trait for interacting with an AI provider.
///
/// Implementations make exactly one request per call and never retry. Any
/// transport or provider failure is returned as [`ChatError::ModelInvocation`].
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ChatError>;
}

dyn_clone::clone_trait_object!(AiProvider);

/// Reads the body of a non-success response into a `ModelInvocation` error.
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> ChatError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    ChatError::ModelInvocation(format!("{provider} API returned {status}: {error_text}"))
}
