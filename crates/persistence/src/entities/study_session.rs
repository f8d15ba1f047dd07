//! Study session entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{GeoPoint, StudySession};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the study_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct StudySessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub studied_time: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StudySessionEntity> for StudySession {
    fn from(entity: StudySessionEntity) -> Self {
        let location = match (entity.latitude, entity.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        };
        Self {
            id: entity.id,
            user_id: entity.user_id,
            // CHECK (studied_time >= 0) holds in the table.
            studied_time: u64::try_from(entity.studied_time).unwrap_or(0),
            location,
            image: entity.image,
            created_at: entity.created_at,
        }
    }
}

/// Aggregated study time for one user.
#[derive(Debug, Clone, FromRow)]
pub struct SessionTotalRow {
    pub user_id: Uuid,
    pub session_count: i64,
    pub total_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(latitude: Option<f64>, longitude: Option<f64>) -> StudySessionEntity {
        StudySessionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            studied_time: 1800,
            latitude,
            longitude,
            image: Some("photo-1".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_location_requires_both_coordinates() {
        let session: StudySession = entity(Some(1.0), Some(2.0)).into();
        assert_eq!(session.location, Some(GeoPoint::new(1.0, 2.0)));
        assert_eq!(session.studied_time, 1800);

        let session: StudySession = entity(Some(1.0), None).into();
        assert!(session.location.is_none());
    }
}
