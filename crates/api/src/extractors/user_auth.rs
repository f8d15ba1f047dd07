//! User JWT authentication extractor.
//!
//! Provides an Axum extractor for validating access tokens from requests.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::User;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user behind a Bearer token.
///
/// The token must carry a valid signature, must not be expired and its
/// session (`jti`) must still be active in the auth backend.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub user: User,
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let invalid = || ApiError::Unauthorized("Invalid or expired token".to_string());
        let claims = state.jwt.validate_token(token).map_err(|_| invalid())?;
        let user_id = claims.user_id().map_err(|_| invalid())?;
        let session_id = claims.session_id().map_err(|_| invalid())?;

        let user = state
            .accounts()
            .authenticate_session(user_id, session_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Session is no longer active".to_string()))?;

        Ok(UserAuth {
            user_id,
            session_id,
            user,
        })
    }
}
