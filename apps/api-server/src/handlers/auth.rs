//! Account registration and login.

use actix_web::{HttpResponse, web};

use campus_core::DomainError;
use campus_core::domain::User;
use campus_core::ports::AuthError;
use campus_shared::ApiResponse;
use campus_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        username: user.username.clone(),
        created_at: user.created_at.to_rfc3339(),
    }
}

fn auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state.tokens.generate_token(user.id, &user.email)?;

    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
        user: user_response(user),
    })
}

fn validate_registration(req: &RegisterUserRequest) -> Result<(), DomainError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation("Invalid email address".to_string()));
    }
    let username_len = req.username.trim().chars().count();
    if !(3..=30).contains(&username_len) {
        return Err(DomainError::Validation(
            "Username must be between 3 and 30 characters".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(DomainError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate_registration(&req)?;

    if state.users.find_by_email(req.email.trim()).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let user = User::new(
        req.email.trim().to_string(),
        req.username.trim().to_string(),
        password_hash,
    );
    let user = state.users.save(user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        auth_response(&state, &user)?,
        "Registration successful",
    )))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .users
        .find_by_email(req.email.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(auth_response(&state, &user)?)))
}

/// GET /api/auth/me
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(&user))))
}
