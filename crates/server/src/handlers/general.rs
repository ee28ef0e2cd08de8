use axum::Json;
use serde_json::{json, Value};

/// The handler for the root (`/`) endpoint.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "datachat server is running.",
        "endpoints": [
            "GET /health",
            "POST /api/v1/generate_sql",
            "POST /api/v1/run_sql",
            "POST /api/v1/chat-with-data",
        ],
    }))
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}
