use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Process liveness only; extraction service health lives on the analysis status route.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}
