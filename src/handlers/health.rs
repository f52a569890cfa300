use crate::config::APP_NAME;
use axum::Json;
use serde_json::{Value, json};

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "up",
        "app": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
