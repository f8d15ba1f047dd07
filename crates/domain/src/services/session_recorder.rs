//! Turns a finalized timer run into a persisted study session.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::{GeoPoint, NewStudySession, StudySession};
use crate::ports::{ImageCapture, LocationProvider, StudySessionStore};
use crate::services::timer::{SessionTimer, TimerState};

/// Optional evidence attached to a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionEvidence {
    pub location: Option<GeoPoint>,
    pub image: Option<String>,
}

impl SessionEvidence {
    pub fn new(location: Option<GeoPoint>, image: Option<String>) -> Self {
        Self { location, image }
    }

    /// Asks each collaborator once. A failing collaborator leaves its field
    /// empty instead of failing the whole recording.
    pub async fn collect(
        location: Option<&dyn LocationProvider>,
        camera: Option<&dyn ImageCapture>,
    ) -> Self {
        let location = match location {
            Some(provider) => match provider.current_location().await {
                Ok(point) => Some(point),
                Err(e) => {
                    warn!(error = %e, "Location unavailable, recording session without it");
                    None
                }
            },
            None => None,
        };

        let image = match camera {
            Some(camera) => match camera.capture_image().await {
                Ok(image) => image,
                Err(e) => {
                    warn!(error = %e, "Image capture failed, recording session without it");
                    None
                }
            },
            None => None,
        };

        Self { location, image }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                return Err(DomainError::Validation(
                    "image: Image reference must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Writes study sessions for finalized timers.
#[derive(Clone)]
pub struct StudySessionRecorder {
    sessions: Arc<dyn StudySessionStore>,
}

impl StudySessionRecorder {
    pub fn new(sessions: Arc<dyn StudySessionStore>) -> Self {
        Self { sessions }
    }

    /// Persists one session for a stopped timer.
    ///
    /// Evidence is validated before any backend call. A backend failure is
    /// returned as is; nothing is retried.
    pub async fn record(
        &self,
        user_id: Uuid,
        timer: &SessionTimer,
        evidence: SessionEvidence,
    ) -> Result<StudySession, DomainError> {
        if timer.state() != TimerState::Stopped {
            return Err(DomainError::Validation(format!(
                "timer: Cannot record a timer that is {}",
                timer.state()
            )));
        }
        evidence.validate()?;

        let session = self
            .sessions
            .create_session(&NewStudySession {
                user_id,
                studied_time: timer.elapsed(),
                location: evidence.location,
                image: evidence.image,
            })
            .await?;

        info!(
            user_id = %user_id,
            session_id = %session.id,
            studied_time = session.studied_time,
            "Study session recorded"
        );
        Ok(session)
    }

    /// A user's sessions, newest first.
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<StudySession>, DomainError> {
        Ok(self.sessions.list_sessions(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::models::{Role, User};
    use crate::ports::{InMemoryBackend, UserStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLocation {
        calls: AtomicUsize,
        result: Result<GeoPoint, BackendError>,
    }

    #[async_trait]
    impl LocationProvider for FixedLocation {
        async fn current_location(&self) -> Result<GeoPoint, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct FixedCamera {
        calls: AtomicUsize,
        result: Result<Option<String>, BackendError>,
    }

    #[async_trait]
    impl ImageCapture for FixedCamera {
        async fn capture_image(&self) -> Result<Option<String>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn stopped_timer(seconds: u64) -> SessionTimer {
        let mut timer = SessionTimer::new();
        timer.start().unwrap();
        for _ in 0..seconds {
            timer.tick();
        }
        timer.stop().unwrap();
        timer
    }

    async fn setup() -> (Arc<InMemoryBackend>, StudySessionRecorder, Uuid) {
        let backend = Arc::new(InMemoryBackend::new());
        let user = User::new_profile(Uuid::new_v4(), "Ana", "ana@example.com", Role::Student);
        backend.set_user(&user).await.unwrap();
        let recorder = StudySessionRecorder::new(backend.clone());
        (backend, recorder, user.id)
    }

    #[tokio::test]
    async fn test_record_uses_finalized_elapsed() {
        let (backend, recorder, user_id) = setup().await;
        let evidence = SessionEvidence::new(
            Some(GeoPoint::new(-23.5, -46.6)),
            Some("file:///photo.jpg".to_string()),
        );

        let session = recorder
            .record(user_id, &stopped_timer(1500), evidence)
            .await
            .unwrap();

        assert_eq!(session.studied_time, 1500);
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.location, Some(GeoPoint::new(-23.5, -46.6)));
        assert_eq!(backend.session_count(), 1);
    }

    #[tokio::test]
    async fn test_record_without_evidence() {
        let (_, recorder, user_id) = setup().await;
        let session = recorder
            .record(user_id, &stopped_timer(0), SessionEvidence::default())
            .await
            .unwrap();
        assert_eq!(session.studied_time, 0);
        assert!(session.location.is_none());
        assert!(session.image.is_none());
    }

    #[tokio::test]
    async fn test_record_requires_stopped_timer() {
        let (backend, recorder, user_id) = setup().await;
        let mut running = SessionTimer::new();
        running.start().unwrap();

        let result = recorder
            .record(user_id, &running, SessionEvidence::default())
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(backend.session_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_location_rejected_before_write() {
        let (backend, recorder, user_id) = setup().await;
        let evidence = SessionEvidence::new(Some(GeoPoint::new(91.0, 0.0)), None);
        let result = recorder.record(user_id, &stopped_timer(5), evidence).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(backend.session_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let (backend, recorder, user_id) = setup().await;
        backend.set_unavailable(true);
        let result = recorder
            .record(user_id, &stopped_timer(5), SessionEvidence::default())
            .await;
        assert!(matches!(result, Err(DomainError::Backend(_))));
        backend.set_unavailable(false);
        assert_eq!(backend.session_count(), 0);
    }

    #[tokio::test]
    async fn test_collect_calls_each_provider_once() {
        let location = FixedLocation {
            calls: AtomicUsize::new(0),
            result: Ok(GeoPoint::new(1.0, 2.0)),
        };
        let camera = FixedCamera {
            calls: AtomicUsize::new(0),
            result: Ok(Some("photo-1".to_string())),
        };

        let evidence = SessionEvidence::collect(Some(&location), Some(&camera)).await;

        assert_eq!(evidence.location, Some(GeoPoint::new(1.0, 2.0)));
        assert_eq!(evidence.image.as_deref(), Some("photo-1"));
        assert_eq!(location.calls.load(Ordering::SeqCst), 1);
        assert_eq!(camera.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_collect_degrades_on_failure() {
        let location = FixedLocation {
            calls: AtomicUsize::new(0),
            result: Err(BackendError::Unavailable("permission denied".into())),
        };
        let camera = FixedCamera {
            calls: AtomicUsize::new(0),
            result: Ok(None),
        };

        let evidence = SessionEvidence::collect(Some(&location), Some(&camera)).await;
        assert_eq!(evidence, SessionEvidence::default());

        let nothing = SessionEvidence::collect(None, None).await;
        assert_eq!(nothing, SessionEvidence::default());
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let (_, recorder, user_id) = setup().await;
        for seconds in [60, 120] {
            recorder
                .record(user_id, &stopped_timer(seconds), SessionEvidence::default())
                .await
                .unwrap();
        }
        let history = recorder.history(user_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].studied_time, 120);
    }
}
