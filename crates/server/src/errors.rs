use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use datachat::ChatError;
use serde_json::json;
use tracing::{debug, error};

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the server,
/// allowing them to be converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors originating from the `datachat` pipeline.
    Chat(ChatError),
    /// A request body that is not JSON or does not fit the request type.
    InvalidBody(JsonRejection),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::Chat(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::Chat(err) => err,
            AppError::InvalidBody(rejection) => {
                debug!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": rejection.body_text() })),
                )
                    .into_response();
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An internal server error occurred." })),
                )
                    .into_response();
            }
        };

        error!("ChatError: {err}");
        let (status_code, body) = match err {
            ChatError::InvalidInput(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ChatError::EmptyQuery => (
                StatusCode::BAD_REQUEST,
                json!({ "error": ChatError::EmptyQuery.to_string() }),
            ),
            ChatError::ExtractionEmpty { raw_model_output } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "Model did not return valid SQL",
                    "raw_model_output": raw_model_output,
                }),
            ),
            err @ (ChatError::ModelInvocation(_) | ChatError::Execution(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            ChatError::InvalidConnectionString(_)
            | ChatError::StorageConnection(_)
            | ChatError::ReqwestClientBuild(_)
            | ChatError::MissingAiProvider
            | ChatError::MissingStorageProvider => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Server is not configured correctly." }),
            ),
        };

        (status_code, Json(body)).into_response()
    }
}
