//! Study session repository.

use std::collections::HashMap;

use async_trait::async_trait;
use domain::models::{NewStudySession, StudySession};
use domain::ports::StudySessionStore;
use domain::BackendError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{SessionTotalRow, StudySessionEntity};
use crate::error::backend_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct StudySessionRepository {
    pool: PgPool,
}

impl StudySessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, session: &NewStudySession) -> Result<StudySessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_study_session");
        let studied_time = i64::try_from(session.studied_time).unwrap_or(i64::MAX);
        let result = sqlx::query_as::<_, StudySessionEntity>(
            r#"
            INSERT INTO study_sessions (user_id, studied_time, latitude, longitude, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, studied_time, latitude, longitude, image, created_at
            "#,
        )
        .bind(session.user_id)
        .bind(studied_time)
        .bind(session.location.map(|l| l.latitude))
        .bind(session.location.map(|l| l.longitude))
        .bind(session.image.as_deref())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<StudySessionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_study_sessions_by_user");
        let result = sqlx::query_as::<_, StudySessionEntity>(
            r#"
            SELECT id, user_id, studied_time, latitude, longitude, image, created_at
            FROM study_sessions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn totals_for(&self, user_ids: &[Uuid]) -> Result<Vec<SessionTotalRow>, sqlx::Error> {
        let timer = QueryTimer::new("sum_study_time_by_user");
        let result = sqlx::query_as::<_, SessionTotalRow>(
            r#"
            SELECT user_id,
                   COUNT(*)::BIGINT AS session_count,
                   COALESCE(SUM(studied_time), 0)::BIGINT AS total_time
            FROM study_sessions
            WHERE user_id = ANY($1)
            GROUP BY user_id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl StudySessionStore for StudySessionRepository {
    async fn create_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySession, BackendError> {
        let entity = self.insert(session).await.map_err(backend_error)?;
        Ok(entity.into())
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<StudySession>, BackendError> {
        let entities = self.find_by_user(user_id).await.map_err(backend_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn session_totals(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, (u64, u64)>, BackendError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self.totals_for(user_ids).await.map_err(backend_error)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.user_id,
                    (
                        u64::try_from(row.session_count).unwrap_or(0),
                        u64::try_from(row.total_time).unwrap_or(0),
                    ),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    // Note: StudySessionRepository tests require a database connection
    // and are covered by tests/postgres_backend.rs
}
