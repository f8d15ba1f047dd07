//! Registration, sign-in and sign-out routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use domain::models::{Role, User};
use domain::services::{SignUpInput, SignedIn};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Sign-in request. `role` is the portal the user is signing in to; an
/// account registered with a different role is rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

fn auth_response(state: &AppState, signed_in: SignedIn) -> Result<AuthResponse, ApiError> {
    let access_token = state
        .jwt
        .issue_access_token(signed_in.user.id, signed_in.session.id)
        .map_err(|e| ApiError::Internal(format!("Failed to issue token: {}", e)))?;

    Ok(AuthResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.access_token_expiry_secs,
        user: signed_in.user,
    })
}

/// Register a new account and sign it in.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<SignUpInput>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let signed_in = state.accounts().sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(auth_response(&state, signed_in)?)))
}

/// Sign in with email, password and expected role.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;
    let signed_in = state
        .accounts()
        .sign_in(&request.email, &request.password, request.role)
        .await?;
    Ok(Json(auth_response(&state, signed_in)?))
}

/// Revoke the session behind the presented token.
///
/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<StatusCode, ApiError> {
    // A running timer is dropped with the session.
    if state.timers.discard(user_auth.user_id).is_ok() {
        info!(user_id = %user_auth.user_id, "Active timer discarded on logout");
    }
    state.accounts().sign_out(user_auth.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
