/// Health endpoints
use actix_web::{web, HttpResponse};
use tracing::warn;

use crate::state::AppState;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

pub async fn live() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Ready while the correlation loop runs and the blob store answers.
pub async fn ready(state: web::Data<AppState>) -> HttpResponse {
    if state.pipeline.correlator().is_closed() {
        return HttpResponse::ServiceUnavailable()
            .json(serde_json::json!({"status": "unavailable", "reason": "correlator closed"}));
    }

    if let Err(e) = state.pipeline.store().health_check().await {
        warn!(error = %e, "Blob store health check failed");
        return HttpResponse::ServiceUnavailable()
            .json(serde_json::json!({"status": "unavailable", "reason": e.to_string()}));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ready",
        "pending_replies": state.pipeline.correlator().pending(),
    }))
}
