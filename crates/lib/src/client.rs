//! # SqlChat
//!
//! The pipeline that ties the prompt builder, the AI provider, the SQL extractor
//! and the storage provider together, and assembles the three response shapes.
//! A `SqlChat` holds no per-request state, so one instance (behind an `Arc`)
//! serves every request concurrently.

use crate::{
    errors::ChatError,
    extractor::extract_sql,
    prompts::PromptBuilder,
    providers::{ai::AiProvider, db::storage::Storage},
    types::{ChatOutcome, QueryOutcome, SqlGeneration},
};
use std::fmt;
use tracing::{debug, error, info};

/// The stages of the combined chat path. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStage {
    Received,
    Prompted,
    Invoked,
    Extracted,
    Executing,
    Succeeded,
    Failed,
}

impl fmt::Display for ChatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChatStage::Received => "received",
            ChatStage::Prompted => "prompted",
            ChatStage::Invoked => "invoked",
            ChatStage::Extracted => "extracted",
            ChatStage::Executing => "executing",
            ChatStage::Succeeded => "succeeded",
            ChatStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Converts questions to SQL and runs it.
pub struct SqlChat {
    pub(crate) ai_provider: Box<dyn AiProvider>,
    pub(crate) storage_provider: Box<dyn Storage>,
    pub(crate) prompt_builder: PromptBuilder,
}

impl fmt::Debug for SqlChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlChat")
            .field("ai_provider", &self.ai_provider)
            .field("storage_provider", &self.storage_provider.name())
            .finish_non_exhaustive()
    }
}

/// A builder for creating `SqlChat` instances.
#[derive(Default)]
pub struct SqlChatBuilder {
    ai_provider: Option<Box<dyn AiProvider>>,
    storage_provider: Option<Box<dyn Storage>>,
    prompt_builder: Option<PromptBuilder>,
}

impl SqlChatBuilder {
    /// Creates a new `SqlChatBuilder`.
    ///
    /// # Examples
    ///
    /// ```
    /// use datachat::SqlChatBuilder;
    ///
    /// let builder = SqlChatBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the AI provider used to generate SQL.
    pub fn ai_provider(mut self, provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(provider);
        self
    }

    /// Sets the storage provider used to execute SQL.
    pub fn storage_provider(mut self, provider: Box<dyn Storage>) -> Self {
        self.storage_provider = Some(provider);
        self
    }

    /// Overrides the default prompt builder (invoice schema, default templates).
    pub fn prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = Some(prompt_builder);
        self
    }

    /// Builds the `SqlChat`, failing if either provider is missing.
    pub fn build(self) -> Result<SqlChat, ChatError> {
        let ai_provider = self.ai_provider.ok_or(ChatError::MissingAiProvider)?;
        let storage_provider = self
            .storage_provider
            .ok_or(ChatError::MissingStorageProvider)?;
        Ok(SqlChat {
            ai_provider,
            storage_provider,
            prompt_builder: self.prompt_builder.unwrap_or_default(),
        })
    }
}

impl SqlChat {
    /// Generates SQL for a question without executing it.
    ///
    /// The returned `sql` is empty when nothing usable could be extracted; the
    /// raw model output is always included so the caller can see why.
    pub async fn generate_sql(&self, question: &str) -> Result<SqlGeneration, ChatError> {
        info!("[generate_sql] received question: {question:?}");
        let prompt = self.prompt_builder.build(question)?;

        debug!(system_prompt = %prompt.system, user_prompt = %prompt.user, "--> Sending prompts to AI Provider");
        let raw_model_output = self
            .ai_provider
            .generate(&prompt.system, &prompt.user)
            .await
            .inspect_err(|e| error!("[generate_sql] AI provider error: {e}"))?;
        debug!("<-- Raw output from AI: {}", &raw_model_output);

        let sql = extract_sql(&raw_model_output);
        debug!(sql = %sql, "Extracted SQL");

        Ok(SqlGeneration {
            question: question.to_string(),
            sql,
            raw_model_output,
        })
    }

    /// Executes caller-supplied SQL, bypassing generation.
    pub async fn run_sql(&self, sql: &str) -> Result<QueryOutcome, ChatError> {
        if sql.trim().is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        info!("[run_sql] executing on {}", self.storage_provider.name());
        let result = self
            .storage_provider
            .execute_query(sql)
            .await
            .inspect_err(|e| error!("[run_sql] Query execution error: {e}"))?;
        Ok(result.into())
    }

    /// Generates SQL for a question, executes it, and returns both.
    ///
    /// Fails with [`ChatError::ExtractionEmpty`] when the model output holds no
    /// usable SQL; nothing is sent to the database in that case.
    pub async fn chat_with_data(&self, question: &str) -> Result<ChatOutcome, ChatError> {
        let mut stage = ChatStage::Received;
        let result = self.chat_stages(question, &mut stage).await;
        let terminal = if result.is_ok() {
            ChatStage::Succeeded
        } else {
            ChatStage::Failed
        };
        debug!(from = %stage, to = %terminal, "chat stage");
        result
    }

    async fn chat_stages(
        &self,
        question: &str,
        stage: &mut ChatStage,
    ) -> Result<ChatOutcome, ChatError> {
        info!("[chat_with_data] received question: {question:?}");
        let prompt = self.prompt_builder.build(question)?;
        advance(stage, ChatStage::Prompted);

        let raw_model_output = self
            .ai_provider
            .generate(&prompt.system, &prompt.user)
            .await
            .inspect_err(|e| error!("[chat_with_data] AI provider error: {e}"))?;
        advance(stage, ChatStage::Invoked);
        debug!("<-- Raw output from AI: {}", &raw_model_output);

        let sql = extract_sql(&raw_model_output);
        advance(stage, ChatStage::Extracted);
        if sql.is_empty() {
            error!("[chat_with_data] Model did not return usable SQL.");
            return Err(ChatError::ExtractionEmpty { raw_model_output });
        }

        advance(stage, ChatStage::Executing);
        let result = self
            .storage_provider
            .execute_query(&sql)
            .await
            .inspect_err(|e| error!("[chat_with_data] Query execution error: {e}"))?;

        Ok(ChatOutcome::new(
            SqlGeneration {
                question: question.to_string(),
                sql,
                raw_model_output,
            },
            result.into(),
        ))
    }
}

fn advance(stage: &mut ChatStage, next: ChatStage) {
    debug!(from = %stage, to = %next, "chat stage");
    *stage = next;
}
