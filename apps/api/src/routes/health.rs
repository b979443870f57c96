use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness probe: always 200 with the service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-screener"
    }))
}
