//! # Question-to-SQL Handlers
//!
//! Thin wrappers over `SqlChat`: each handler forwards the body to the pipeline
//! and lets `AppError` turn failures into status codes. Bodies are taken as
//! `Result` so a wrongly typed field is a JSON 400 like any other bad input.

use crate::{
    errors::AppError,
    state::AppState,
    types::{QuestionRequest, RunSqlRequest},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use datachat::{ChatOutcome, QueryOutcome, SqlGeneration};
use tracing::info;

/// Generates SQL for a question without running it.
pub async fn generate_sql_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<SqlGeneration>, AppError> {
    let Json(payload) = payload?;
    info!("Received generate_sql request: {:?}", payload.question);
    let generation = app_state.chat.generate_sql(&payload.question).await?;
    Ok(Json(generation))
}

/// Runs caller-supplied SQL.
pub async fn run_sql_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<RunSqlRequest>, JsonRejection>,
) -> Result<Json<QueryOutcome>, AppError> {
    let Json(payload) = payload?;
    info!("Received run_sql request.");
    let outcome = app_state.chat.run_sql(&payload.sql).await?;
    Ok(Json(outcome))
}

/// Generates SQL for a question, runs it, and returns both.
pub async fn chat_with_data_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<ChatOutcome>, AppError> {
    let Json(payload) = payload?;
    info!("Received chat-with-data request: {:?}", payload.question);
    let outcome = app_state.chat.chat_with_data(&payload.question).await?;
    Ok(Json(outcome))
}
