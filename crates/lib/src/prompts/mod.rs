//! # Prompt Builder
//!
//! Combines the schema descriptor and the SQL formatting rules into a system
//! prompt, and wraps the user's question into the user prompt. The question is
//! never placed in the system prompt.

pub mod sql;

use crate::{
    errors::ChatError,
    schema::{SchemaDescriptor, INVOICE_SCHEMA},
};
use sql::{EXAMPLE_QUERY, SQL_GENERATION_SYSTEM_PROMPT, SQL_GENERATION_USER_PROMPT};

/// The pair of prompts sent to the AI provider for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds prompts from a schema and a pair of templates.
///
/// The system prompt is rendered once at construction, since neither the schema
/// nor the template changes for the life of the process.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    user_template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(&INVOICE_SCHEMA)
    }
}

impl PromptBuilder {
    /// Creates a builder using the default templates.
    pub fn new(schema: &SchemaDescriptor) -> Self {
        Self::with_templates(
            schema,
            SQL_GENERATION_SYSTEM_PROMPT,
            SQL_GENERATION_USER_PROMPT,
        )
    }

    /// Creates a builder from custom templates.
    ///
    /// The system template may use `{schema}`, `{aliases}` and `{example}`;
    /// the user template may use `{question}`.
    pub fn with_templates(
        schema: &SchemaDescriptor,
        system_template: &str,
        user_template: &str,
    ) -> Self {
        let system_prompt = system_template
            .replace("{schema}", &schema.to_string())
            .replace("{aliases}", &schema.render_aliases())
            .replace("{example}", EXAMPLE_QUERY);
        Self {
            system_prompt,
            user_template: user_template.to_string(),
        }
    }

    /// The fully rendered system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Builds the prompts for a question. Fails if the question is blank.
    pub fn build(&self, question: &str) -> Result<Prompt, ChatError> {
        if question.trim().is_empty() {
            return Err(ChatError::InvalidInput("Question is required".to_string()));
        }
        Ok(Prompt {
            system: self.system_prompt.clone(),
            user: self.user_template.replace("{question}", question),
        })
    }
}
