//! Profile routes for the signed-in user.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use domain::models::{User, UserStudySummary};
use domain::services::UpdateProfileInput;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// GET /api/v1/users/me
pub async fn get_me(user_auth: UserAuth) -> Json<User> {
    Json(user_auth.user)
}

/// PATCH /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    user_auth: UserAuth,
    payload: Result<Json<UpdateProfileInput>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(request) = payload?;
    let user = state.accounts().rename(user_auth.user_id, request).await?;
    Ok(Json(user))
}

/// Session count and total studied time for the signed-in user.
///
/// GET /api/v1/users/me/summary
pub async fn get_my_summary(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<UserStudySummary>, ApiError> {
    let summary = state.ranking().user_summary(user_auth.user_id).await?;
    Ok(Json(summary))
}
