//! File uploads to object storage.

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Deserialize;

use campus_core::ports::UploadMetadata;
use campus_shared::ApiResponse;
use campus_shared::dto::UploadResponse;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "general".to_string()
}

/// POST /api/uploads?folder=<name> with the raw file as the body.
pub async fn upload(
    state: web::Data<AppState>,
    identity: Identity,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported file type: {}",
            if content_type.is_empty() { "none" } else { content_type.as_str() }
        )));
    }

    let folder = query.into_inner().folder;
    if folder.is_empty() || !folder.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::BadRequest("Invalid folder name".to_string()));
    }

    let stored = state
        .storage
        .upload(
            body.to_vec(),
            UploadMetadata {
                content_type,
                folder,
            },
        )
        .await?;

    tracing::info!(user_id = %identity.user_id, object_id = %stored.id, "File uploaded");

    Ok(HttpResponse::Created().json(ApiResponse::ok(UploadResponse {
        url: stored.url,
        id: stored.id,
    })))
}
