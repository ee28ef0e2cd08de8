use super::{handlers, state::AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/generate_sql",
            post(handlers::generate_sql_handler),
        )
        .route("/api/v1/run_sql", post(handlers::run_sql_handler))
        .route(
            "/api/v1/chat-with-data",
            post(handlers::chat_with_data_handler),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
