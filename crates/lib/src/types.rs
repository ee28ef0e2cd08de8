//! # Pipeline Types
//!
//! The tabular result produced by a storage provider and the three payloads
//! returned by [`SqlChat`](crate::SqlChat): generate-only, execute-only, and
//! the combined chat response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row, keyed by column name in column order.
pub type Row = Map<String, Value>;

/// The materialized result of a statement, in the order the database returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The generate-only payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlGeneration {
    pub question: String,
    /// The extracted statement. Empty when nothing usable was found.
    pub sql: String,
    pub raw_model_output: String,
}

/// The execute-only payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub data: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
}

impl From<QueryResult> for QueryOutcome {
    fn from(result: QueryResult) -> Self {
        let row_count = result.row_count();
        Self {
            data: result.rows,
            columns: result.columns,
            row_count,
        }
    }
}

/// The combined payload: the generated SQL together with its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub question: String,
    pub sql: String,
    pub raw_model_output: String,
    pub data: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
}

impl ChatOutcome {
    pub fn new(generation: SqlGeneration, outcome: QueryOutcome) -> Self {
        Self {
            question: generation.question,
            sql: generation.sql,
            raw_model_output: generation.raw_model_output,
            data: outcome.data,
            columns: outcome.columns,
            row_count: outcome.row_count,
        }
    }
}
