use crate::{errors::ChatError, types::QueryResult};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for executing SQL against a storage backend.
///
/// Implementations must be safe to call from many requests at once; a provider
/// backed by a single shared connection does not satisfy this.
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "PostgreSQL").
    fn name(&self) -> &str;

    /// Executes a statement and materializes every returned row.
    ///
    /// Fails with [`ChatError::EmptyQuery`] for blank input and
    /// [`ChatError::Execution`] for anything the database rejects.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult, ChatError>;
}

dyn_clone::clone_trait_object!(Storage);
