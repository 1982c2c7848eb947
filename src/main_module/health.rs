//! Liveness probe

use axum::http::StatusCode;
use axum::Json;

pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "ok": true,
            "service": "leadline",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
