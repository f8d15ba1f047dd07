//! Backend ports.
//!
//! Every service receives the capabilities it needs as trait objects, so the
//! same logic runs against PostgreSQL in production and against
//! [`memory::InMemoryBackend`] in tests.

pub mod events;
pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{
    AuthEvent, AuthSession, GeoPoint, Group, GroupPatch, NewGroup, NewStudySession, StudySession,
    User, UserPatch,
};

pub use events::AuthEventHub;
pub use memory::InMemoryBackend;

/// User profile documents.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError>;

    /// Creates or replaces a profile.
    async fn set_user(&self, user: &User) -> Result<(), BackendError>;

    /// Applies a partial update. Returns `None` if the user does not exist.
    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, BackendError>;

    /// Atomically moves the membership pointer from `expected` to `new`.
    ///
    /// Returns `false` without writing if the user does not exist or its
    /// current pointer differs from `expected`. Fails with
    /// [`BackendError::MissingReference`] if `new` names a missing group.
    async fn assign_group(
        &self,
        user_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, BackendError>;

    /// Users whose membership pointer names `group_id`.
    async fn list_group_members(&self, group_id: Uuid) -> Result<Vec<User>, BackendError>;
}

/// Group documents.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn create_group(&self, group: &NewGroup) -> Result<Group, BackendError>;

    async fn get_group(&self, id: Uuid) -> Result<Option<Group>, BackendError>;

    /// Returns `None` if the group does not exist.
    async fn update_group(&self, id: Uuid, patch: &GroupPatch)
        -> Result<Option<Group>, BackendError>;

    /// Deletes the group and clears the membership pointer of every member in
    /// the same atomic step. Returns the number of released members, or
    /// `None` if the group did not exist.
    async fn delete_group(&self, id: Uuid) -> Result<Option<u64>, BackendError>;

    async fn list_groups(&self) -> Result<Vec<Group>, BackendError>;
}

/// Study session documents.
#[async_trait]
pub trait StudySessionStore: Send + Sync {
    async fn create_session(&self, session: &NewStudySession)
        -> Result<StudySession, BackendError>;

    /// Sessions of one user, newest first.
    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<StudySession>, BackendError>;

    /// Per-user `(session_count, total_seconds)`. Users without sessions may
    /// be absent from the map.
    async fn session_totals(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, (u64, u64)>, BackendError> {
        let mut totals = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            let sessions = self.list_sessions(*user_id).await?;
            let total = sessions
                .iter()
                .fold(0u64, |acc, s| acc.saturating_add(s.studied_time));
            totals.insert(*user_id, (sessions.len() as u64, total));
        }
        Ok(totals)
    }
}

/// Identity management.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registers credentials and returns the new user id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, BackendError>;

    /// Verifies credentials and opens a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    /// Revokes a session. Revoking an unknown or revoked session is a no-op.
    async fn sign_out(&self, session_id: Uuid) -> Result<(), BackendError>;

    async fn is_session_active(&self, session_id: Uuid) -> Result<bool, BackendError>;

    /// Stream of auth state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Device position lookup.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<GeoPoint, BackendError>;
}

/// Photo capture. `Ok(None)` means the user cancelled.
#[async_trait]
pub trait ImageCapture: Send + Sync {
    async fn capture_image(&self) -> Result<Option<String>, BackendError>;
}

/// Liveness of the backend connection.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), BackendError>;
}

/// The set of backend capabilities handed to services.
#[derive(Clone)]
pub struct Backend {
    pub users: Arc<dyn UserStore>,
    pub groups: Arc<dyn GroupStore>,
    pub sessions: Arc<dyn StudySessionStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub health: Arc<dyn HealthProbe>,
}

impl Backend {
    /// Backend where every port is served by one in-memory store.
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(InMemoryBackend::new()))
    }

    pub fn from_memory(store: Arc<InMemoryBackend>) -> Self {
        Self {
            users: store.clone(),
            groups: store.clone(),
            sessions: store.clone(),
            auth: store.clone(),
            health: store,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
