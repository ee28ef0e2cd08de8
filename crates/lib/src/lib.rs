//! # Natural Language to SQL
//!
//! This crate turns a natural-language question into a single SQL statement for
//! a fixed invoice schema, executes it against PostgreSQL, and returns the rows.
//!
//! The pipeline is: [`prompts::PromptBuilder`] → [`providers::ai::AiProvider`] →
//! [`extractor::extract_sql`] → [`providers::db::storage::Storage`], assembled by
//! [`SqlChat`].

pub mod client;
pub mod errors;
pub mod extractor;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod types;

pub use client::{ChatStage, SqlChat, SqlChatBuilder};
pub use errors::ChatError;
pub use extractor::extract_sql;
pub use schema::{SchemaDescriptor, INVOICE_SCHEMA};
pub use types::{ChatOutcome, QueryOutcome, QueryResult, SqlGeneration};
