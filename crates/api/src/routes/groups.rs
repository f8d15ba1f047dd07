//! Study group routes: administration, membership and ranking.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use domain::models::group::{
    CreateGroupRequest, DeleteGroupResponse, GroupResponse, ListGroupsResponse,
    MembershipResponse, RenameGroupRequest,
};
use domain::models::GroupRanking;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_group_operation;

/// GET /api/v1/groups
pub async fn list_groups(
    State(state): State<AppState>,
    _user_auth: UserAuth,
) -> Result<Json<ListGroupsResponse>, ApiError> {
    let groups = state.memberships().list().await?;
    let data: Vec<GroupResponse> = groups.into_iter().map(GroupResponse::from).collect();

    Ok(Json(ListGroupsResponse {
        count: data.len(),
        data,
    }))
}

/// Create an empty group.
///
/// POST /api/v1/groups
///
/// Administrators only.
pub async fn create_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    let Json(request) = payload?;
    let group = state
        .memberships()
        .create(user_auth.user_id, &request.name)
        .await?;
    record_group_operation("create");

    Ok((StatusCode::CREATED, Json(group.into())))
}

/// GET /api/v1/groups/:group_id
pub async fn get_group(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state.memberships().get(group_id).await?;
    Ok(Json(group.into()))
}

/// PATCH /api/v1/groups/:group_id
pub async fn rename_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
    payload: Result<Json<RenameGroupRequest>, JsonRejection>,
) -> Result<Json<GroupResponse>, ApiError> {
    let Json(request) = payload?;
    let group = state
        .memberships()
        .rename(user_auth.user_id, group_id, &request.name)
        .await?;
    record_group_operation("rename");

    Ok(Json(group.into()))
}

/// Delete a group. Its members end up without a group.
///
/// DELETE /api/v1/groups/:group_id
pub async fn delete_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<DeleteGroupResponse>, ApiError> {
    let released_members = state
        .memberships()
        .delete(user_auth.user_id, group_id)
        .await?;
    record_group_operation("delete");

    Ok(Json(DeleteGroupResponse {
        deleted: true,
        group_id,
        released_members,
    }))
}

/// POST /api/v1/groups/:group_id/join
pub async fn join_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state.memberships().join(user_auth.user_id, group_id).await?;
    record_group_operation("join");

    Ok(Json(group.into()))
}

/// POST /api/v1/groups/:group_id/leave
pub async fn leave_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<MembershipResponse>, ApiError> {
    state
        .memberships()
        .leave(user_auth.user_id, group_id)
        .await?;
    record_group_operation("leave");

    Ok(Json(MembershipResponse {
        user_id: user_auth.user_id,
        group_id: None,
    }))
}

/// Members ordered by total studied time; the first entry is the leader.
///
/// GET /api/v1/groups/:group_id/ranking
pub async fn get_ranking(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupRanking>, ApiError> {
    let ranking = state.ranking().group_ranking(group_id).await?;
    Ok(Json(ranking))
}
