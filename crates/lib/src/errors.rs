use thiserror::Error;

/// Custom error types for the question-to-SQL pipeline.
///
/// The variants fall into three failure domains: the model call, SQL extraction,
/// and execution against the database. Input and configuration errors sit
/// alongside them so the server can map every failure to a response.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),
    #[error("Model did not return valid SQL. Raw output: {raw_model_output}")]
    ExtractionEmpty { raw_model_output: String },
    #[error("No SQL provided to execute")]
    EmptyQuery,
    #[error("SQL execution error: {0}")]
    Execution(String),
    #[error("Invalid database connection string: {0}")]
    InvalidConnectionString(String),
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("AI provider is missing")]
    MissingAiProvider,
    #[error("Storage provider is missing")]
    MissingStorageProvider,
}

impl From<tokio_postgres::Error> for ChatError {
    /// Prefers the server-side message when Postgres rejected the statement,
    /// so callers see e.g. `column "foo" does not exist` rather than `db error`.
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => ChatError::Execution(db_err.message().to_string()),
            None => ChatError::Execution(err.to_string()),
        }
    }
}

impl From<deadpool_postgres::PoolError> for ChatError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) => e.into(),
            other => ChatError::Execution(other.to_string()),
        }
    }
}
