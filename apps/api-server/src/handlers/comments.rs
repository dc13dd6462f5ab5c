//! Comments on feed posts.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use campus_core::DomainError;
use campus_core::domain::Comment;
use campus_shared::ApiResponse;
use campus_shared::dto::{CommentResponse, CreateCommentRequest};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

const MAX_COMMENT_CHARS: usize = 1000;

/// POST /api/posts/{post_id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let text = body.into_inner().body.trim().to_string();
    if text.is_empty() || text.chars().count() > MAX_COMMENT_CHARS {
        return Err(DomainError::Validation(format!(
            "Comment must be between 1 and {} characters",
            MAX_COMMENT_CHARS
        ))
        .into());
    }

    let comment = state
        .comments
        .save(Comment::new(path.into_inner(), identity.user_id, text))
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(CommentResponse {
        id: comment.id.to_string(),
        post_id: comment.post_id.to_string(),
        author_id: comment.author_id.to_string(),
        body: comment.body,
        created_at: comment.created_at.to_rfc3339(),
    })))
}
