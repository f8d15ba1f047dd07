//! Study session domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{validate_image_reference, validate_latitude, validate_longitude};
use uuid::Uuid;
use validator::Validate;

/// A coordinate attached to a study session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct GeoPoint {
    #[validate(custom(function = "validate_latitude"))]
    pub latitude: f64,
    #[validate(custom(function = "validate_longitude"))]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One completed, timed study interval. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Seconds studied.
    pub studied_time: u64,
    pub location: Option<GeoPoint>,
    /// Opaque reference to the photo taken as evidence.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a study session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudySession {
    pub user_id: Uuid,
    pub studied_time: u64,
    pub location: Option<GeoPoint>,
    pub image: Option<String>,
}

/// Request payload for stopping the timer and recording the session.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct StopTimerRequest {
    #[validate(nested)]
    pub location: Option<GeoPoint>,

    #[validate(custom(function = "validate_image_reference"))]
    pub image: Option<String>,
}

/// Response for listing a user's sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListSessionsResponse {
    pub data: Vec<StudySession>,
    pub count: usize,
    pub total_time_studied: u64,
}
