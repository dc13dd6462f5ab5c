//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use campus_infra::BackendState;
use campus_shared::ApiResponse;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// `shared` while Redis serves rate limiting, `local` once degraded.
    pub rate_limit_backend: &'static str,
}

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let rate_limit_backend = match state.selector.state() {
        BackendState::ShouldUseShared => "shared",
        BackendState::UseLocal => "local",
    };

    HttpResponse::Ok().json(ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        rate_limit_backend,
    }))
}
