//! Study timer and session history routes.
//!
//! Each student has at most one timer. Stopping it records a study session
//! with the elapsed seconds and any evidence sent in the request body.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use domain::models::study_session::{ListSessionsResponse, StopTimerRequest};
use domain::models::StudySession;
use domain::services::{total_studied_time, SessionEvidence, TimerSnapshot, TimerState};
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_study_session_recorded;

fn require_student(user_auth: &UserAuth) -> Result<(), ApiError> {
    if user_auth.user.role.can_study() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only students can record study sessions".to_string(),
        ))
    }
}

/// Current timer, or an idle one when none is active.
///
/// GET /api/v1/study-sessions/timer
pub async fn get_timer(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Json<TimerSnapshot> {
    let snapshot = state
        .timers
        .snapshot(user_auth.user_id)
        .unwrap_or(TimerSnapshot {
            state: TimerState::Idle,
            elapsed: 0,
        });
    Json(snapshot)
}

/// POST /api/v1/study-sessions/timer/start
pub async fn start_timer(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<(StatusCode, Json<TimerSnapshot>), ApiError> {
    require_student(&user_auth)?;
    let snapshot = state.timers.start(user_auth.user_id)?;
    info!(user_id = %user_auth.user_id, "Study timer started");
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// POST /api/v1/study-sessions/timer/pause
pub async fn pause_timer(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<TimerSnapshot>, ApiError> {
    Ok(Json(state.timers.pause(user_auth.user_id)?))
}

/// POST /api/v1/study-sessions/timer/resume
pub async fn resume_timer(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<TimerSnapshot>, ApiError> {
    Ok(Json(state.timers.resume(user_auth.user_id)?))
}

/// Stop the timer and record the session.
///
/// POST /api/v1/study-sessions/timer/stop
///
/// Evidence is validated before the timer is touched. When recording fails
/// the stopped timer is kept so the request can be retried.
pub async fn stop_timer(
    State(state): State<AppState>,
    user_auth: UserAuth,
    payload: Result<Json<StopTimerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StudySession>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;
    let evidence = SessionEvidence::new(request.location, request.image);
    evidence.validate()?;

    let timer = state.timers.stop(user_auth.user_id)?;

    match state
        .recorder()
        .record(user_auth.user_id, &timer, evidence)
        .await
    {
        Ok(session) => {
            record_study_session_recorded(session.studied_time);
            Ok((StatusCode::CREATED, Json(session)))
        }
        Err(e) => {
            warn!(
                user_id = %user_auth.user_id,
                elapsed = timer.elapsed(),
                error = %e,
                "Failed to record study session; timer kept for retry"
            );
            state.timers.restore(user_auth.user_id, timer);
            Err(e.into())
        }
    }
}

/// Drop the active timer without recording anything.
///
/// DELETE /api/v1/study-sessions/timer
pub async fn discard_timer(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<StatusCode, ApiError> {
    state.timers.discard(user_auth.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user's sessions, newest first.
///
/// GET /api/v1/study-sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let sessions = state.recorder().history(user_auth.user_id).await?;

    Ok(Json(ListSessionsResponse {
        count: sessions.len(),
        total_time_studied: total_studied_time(&sessions),
        data: sessions,
    }))
}
