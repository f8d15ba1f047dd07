use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::ports::Backend;
use domain::services::{
    AccountService, GroupMembershipManager, RankingService, StopwatchRegistry,
    StudySessionRecorder,
};
use shared::jwt::{JwtConfig, JwtError};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{auth, groups, health, study_sessions, users};

#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub timers: Arc<StopwatchRegistry>,
}

impl AppState {
    pub fn new(config: Config, backend: Backend) -> Result<Self, JwtError> {
        let jwt = JwtConfig::with_leeway(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.leeway_secs,
        )?;
        let timers = StopwatchRegistry::new(config.timer.tick_interval());

        Ok(Self {
            backend,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            timers: Arc::new(timers),
        })
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.backend.auth.clone(), self.backend.users.clone())
    }

    pub fn memberships(&self) -> GroupMembershipManager {
        GroupMembershipManager::new(self.backend.users.clone(), self.backend.groups.clone())
    }

    pub fn ranking(&self) -> RankingService {
        RankingService::new(
            self.backend.users.clone(),
            self.backend.groups.clone(),
            self.backend.sessions.clone(),
        )
    }

    pub fn recorder(&self) -> StudySessionRecorder {
        StudySessionRecorder::new(self.backend.sessions.clone())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Development: allow any origin
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Profile
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route("/users/me/summary", get(users::get_my_summary))
        // Groups
        .route(
            "/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route(
            "/groups/:group_id",
            get(groups::get_group)
                .patch(groups::rename_group)
                .delete(groups::delete_group),
        )
        .route("/groups/:group_id/join", post(groups::join_group))
        .route("/groups/:group_id/leave", post(groups::leave_group))
        .route("/groups/:group_id/ranking", get(groups::get_ranking))
        // Study timer and sessions
        .route(
            "/study-sessions/timer",
            get(study_sessions::get_timer).delete(study_sessions::discard_timer),
        )
        .route("/study-sessions/timer/start", post(study_sessions::start_timer))
        .route("/study-sessions/timer/pause", post(study_sessions::pause_timer))
        .route("/study-sessions/timer/resume", post(study_sessions::resume_timer))
        .route("/study-sessions/timer/stop", post(study_sessions::stop_timer))
        .route("/study-sessions", get(study_sessions::list_sessions));

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/api/health/ready", get(health::ready))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
