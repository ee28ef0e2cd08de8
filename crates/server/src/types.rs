//! Request bodies for the API endpoints. Missing fields deserialize as empty
//! strings so the pipeline can reject them with a 400 rather than axum's 422.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSqlRequest {
    #[serde(default)]
    pub sql: String,
}
