//! Bearer token extraction.

use std::future::{Ready, ready};

use actix_web::http::header::{self, HeaderMap};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use uuid::Uuid;

use campus_core::ports::{AuthError, TokenClaims, TokenService};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Authenticated caller. Add it to a handler's arguments to require a token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

/// Validate the `Authorization: Bearer <token>` header, if any.
pub fn bearer_claims(headers: &HeaderMap, tokens: &dyn TokenService) -> Result<TokenClaims, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

    tokens.validate_token(token)
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(AppError::Internal(
                "AppState not found in app data".to_string(),
            )));
        };

        ready(
            bearer_claims(req.headers(), state.tokens.as_ref())
                .map(Identity::from)
                .map_err(AppError::from),
        )
    }
}
