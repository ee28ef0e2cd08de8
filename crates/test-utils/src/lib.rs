//! # Test Utilities
//!
//! Mock AI and storage providers shared by the `datachat` and
//! `datachat-server` test suites. Both record every call so tests can assert
//! on what was (or was not) sent.

use async_trait::async_trait;
use datachat::{
    errors::ChatError,
    providers::{ai::AiProvider, db::storage::Storage},
    types::{QueryResult, Row},
};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Mock AI Provider ---

#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    responses: Arc<Mutex<Vec<(String, String)>>>,
    failure: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    delay: Option<Duration>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits before answering, to force interleaving in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Pre-programs a response. The key should be a unique substring of the user prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((key.to_string(), response.to_string()));
    }

    /// Makes every call fail with a `ModelInvocation` error carrying `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Retrieves the recorded `(system_prompt, user_prompt)` calls.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ChatError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ChatError::ModelInvocation(message));
        }

        let responses = self.responses.lock().unwrap();
        responses
            .iter()
            .find(|(key, _)| user_prompt.contains(key.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| {
                ChatError::ModelInvocation(format!(
                    "MockAiProvider: No response programmed for user prompt. Got: '{user_prompt}'"
                ))
            })
    }
}

// --- Mock Storage Provider ---

#[derive(Clone, Debug, Default)]
pub struct MockStorage {
    results: Arc<Mutex<Vec<(String, Result<QueryResult, String>)>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Pre-programs the result for any SQL containing `key`.
    pub fn add_result(&self, key: &str, result: QueryResult) {
        self.results
            .lock()
            .unwrap()
            .push((key.to_string(), Ok(result)));
    }

    /// Pre-programs a database error for any SQL containing `key`.
    pub fn add_error(&self, key: &str, message: &str) {
        self.results
            .lock()
            .unwrap()
            .push((key.to_string(), Err(message.to_string())));
    }

    /// Retrieves the SQL of every recorded call.
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MockStorage {
    fn name(&self) -> &str {
        "MockStorage"
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, ChatError> {
        self.calls.lock().unwrap().push(sql.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let results = self.results.lock().unwrap();
        match results.iter().find(|(key, _)| sql.contains(key.as_str())) {
            Some((_, Ok(result))) => Ok(result.clone()),
            Some((_, Err(message))) => Err(ChatError::Execution(message.clone())),
            None => Err(ChatError::Execution(format!(
                "MockStorage: No result programmed for SQL. Got: '{sql}'"
            ))),
        }
    }
}

// --- Mock Data Helpers ---

/// Builds a `QueryResult` from column names and rows of values in column order.
pub fn query_result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    let rows = rows
        .into_iter()
        .map(|values| {
            columns
                .iter()
                .map(|c| c.to_string())
                .zip(values)
                .collect::<Row>()
        })
        .collect();
    QueryResult {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}
