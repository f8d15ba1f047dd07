//! In-memory implementation of every backend port.
//!
//! All state sits behind one mutex, so each port call is atomic with respect
//! to every other call. Used by unit tests and by the API integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use shared::password::{hash_password, verify_password};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{AuthEventHub, AuthProvider, GroupStore, HealthProbe, StudySessionStore, UserStore};
use crate::error::BackendError;
use crate::models::{
    AuthEvent, AuthSession, Group, GroupPatch, NewGroup, NewStudySession, StudySession, User,
    UserPatch,
};

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct StoredGroup {
    id: Uuid,
    name: String,
    created_by: Uuid,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredAuthSession {
    session: AuthSession,
    revoked: bool,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, StoredGroup>,
    accounts: HashMap<String, Account>,
    auth_sessions: HashMap<Uuid, StoredAuthSession>,
    study_sessions: Vec<StudySession>,
}

impl State {
    /// Members of a group, ordered by name then id.
    fn members_of(&self, group_id: Uuid) -> Vec<&User> {
        let mut members: Vec<&User> = self
            .users
            .values()
            .filter(|u| u.group_id == Some(group_id))
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        members
    }

    fn materialize(&self, stored: &StoredGroup) -> Group {
        Group {
            id: stored.id,
            name: stored.name.clone(),
            created_by: stored.created_by,
            members: self.members_of(stored.id).iter().map(|u| u.id).collect(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

/// Backend held entirely in process memory.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    events: AuthEventHub,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            events: AuthEventHub::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every port call fails with [`BackendError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored study sessions across all users.
    pub fn session_count(&self) -> usize {
        self.lock().study_sessions.len()
    }

    /// Number of stored groups.
    pub fn group_count(&self) -> usize {
        self.lock().groups.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "in-memory backend switched off".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryBackend {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
        self.check_available()?;
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn set_user(&self, user: &User) -> Result<(), BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        if let Some(group_id) = user.group_id {
            if !state.groups.contains_key(&group_id) {
                return Err(BackendError::MissingReference(format!("group {}", group_id)));
            }
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn assign_group(
        &self,
        user_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        if let Some(group_id) = new {
            if !state.groups.contains_key(&group_id) {
                return Err(BackendError::MissingReference(format!("group {}", group_id)));
            }
        }
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.group_id != expected {
            return Ok(false);
        }
        user.group_id = new;
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_group_members(&self, group_id: Uuid) -> Result<Vec<User>, BackendError> {
        self.check_available()?;
        let state = self.lock();
        Ok(state.members_of(group_id).into_iter().cloned().collect())
    }
}

#[async_trait]
impl GroupStore for InMemoryBackend {
    async fn create_group(&self, group: &NewGroup) -> Result<Group, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        let now = Utc::now();
        let stored = StoredGroup {
            id: Uuid::new_v4(),
            name: group.name.clone(),
            created_by: group.created_by,
            created_at: now,
            updated_at: now,
        };
        let created = state.materialize(&stored);
        state.groups.insert(stored.id, stored);
        Ok(created)
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<Group>, BackendError> {
        self.check_available()?;
        let state = self.lock();
        Ok(state.groups.get(&id).map(|g| state.materialize(g)))
    }

    async fn update_group(
        &self,
        id: Uuid,
        patch: &GroupPatch,
    ) -> Result<Option<Group>, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        let Some(stored) = state.groups.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            stored.name = name.clone();
        }
        stored.updated_at = Utc::now();
        let stored = stored.clone();
        Ok(Some(state.materialize(&stored)))
    }

    async fn delete_group(&self, id: Uuid) -> Result<Option<u64>, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        if state.groups.remove(&id).is_none() {
            return Ok(None);
        }
        let now = Utc::now();
        let mut released = 0u64;
        for user in state.users.values_mut() {
            if user.group_id == Some(id) {
                user.group_id = None;
                user.updated_at = now;
                released += 1;
            }
        }
        Ok(Some(released))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, BackendError> {
        self.check_available()?;
        let state = self.lock();
        let mut groups: Vec<Group> = state.groups.values().map(|g| state.materialize(g)).collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }
}

#[async_trait]
impl StudySessionStore for InMemoryBackend {
    async fn create_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySession, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        if !state.users.contains_key(&session.user_id) {
            return Err(BackendError::MissingReference(format!(
                "user {}",
                session.user_id
            )));
        }
        let created = StudySession {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            studied_time: session.studied_time,
            location: session.location,
            image: session.image.clone(),
            created_at: Utc::now(),
        };
        state.study_sessions.push(created.clone());
        Ok(created)
    }

    async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<StudySession>, BackendError> {
        self.check_available()?;
        let state = self.lock();
        // Insertion order is chronological; reverse for newest first.
        Ok(state
            .study_sessions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthProvider for InMemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, BackendError> {
        self.check_available()?;
        let password_hash =
            hash_password(password).map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let id = {
            let mut state = self.lock();
            if state.accounts.contains_key(email) {
                return Err(BackendError::Duplicate("email".to_string()));
            }
            let id = Uuid::new_v4();
            state.accounts.insert(
                email.to_string(),
                Account {
                    id,
                    password_hash,
                },
            );
            id
        };
        self.events.publish(AuthEvent::SignedUp { user_id: id });
        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        self.check_available()?;
        let account = self
            .lock()
            .accounts
            .get(email)
            .cloned()
            .ok_or(BackendError::InvalidCredentials)?;

        let valid = verify_password(password, &account.password_hash)
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        if !valid {
            return Err(BackendError::InvalidCredentials);
        }

        let session = AuthSession {
            id: Uuid::new_v4(),
            user_id: account.id,
            created_at: Utc::now(),
        };
        self.lock().auth_sessions.insert(
            session.id,
            StoredAuthSession {
                session: session.clone(),
                revoked: false,
            },
        );
        self.events.publish(AuthEvent::SignedIn {
            user_id: session.user_id,
            session_id: session.id,
        });
        Ok(session)
    }

    async fn sign_out(&self, session_id: Uuid) -> Result<(), BackendError> {
        self.check_available()?;
        let revoked_user = {
            let mut state = self.lock();
            match state.auth_sessions.get_mut(&session_id) {
                Some(stored) if !stored.revoked => {
                    stored.revoked = true;
                    Some(stored.session.user_id)
                }
                _ => None,
            }
        };
        if let Some(user_id) = revoked_user {
            self.events.publish(AuthEvent::SignedOut {
                user_id,
                session_id,
            });
        }
        Ok(())
    }

    async fn is_session_active(&self, session_id: Uuid) -> Result<bool, BackendError> {
        self.check_available()?;
        Ok(self
            .lock()
            .auth_sessions
            .get(&session_id)
            .map(|s| !s.revoked)
            .unwrap_or(false))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl HealthProbe for InMemoryBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    async fn seed_user(backend: &InMemoryBackend, name: &str) -> User {
        let user = User::new_profile(
            Uuid::new_v4(),
            name,
            &format!("{}@example.com", name.to_lowercase()),
            Role::Student,
        );
        backend.set_user(&user).await.unwrap();
        user
    }

    async fn seed_group(backend: &InMemoryBackend, name: &str) -> Group {
        backend
            .create_group(&NewGroup {
                name: name.to_string(),
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_assign_group_is_compare_and_set() {
        let backend = InMemoryBackend::new();
        let user = seed_user(&backend, "Ana").await;
        let g1 = seed_group(&backend, "Biology").await;
        let g2 = seed_group(&backend, "Chemistry").await;

        assert!(backend.assign_group(user.id, None, Some(g1.id)).await.unwrap());
        // Stale expectation fails without writing.
        assert!(!backend.assign_group(user.id, None, Some(g2.id)).await.unwrap());

        let stored = backend.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.group_id, Some(g1.id));
    }

    #[tokio::test]
    async fn test_assign_group_to_missing_group() {
        let backend = InMemoryBackend::new();
        let user = seed_user(&backend, "Ana").await;
        let result = backend.assign_group(user.id, None, Some(Uuid::new_v4())).await;
        assert!(matches!(result, Err(BackendError::MissingReference(_))));
    }

    #[tokio::test]
    async fn test_members_are_derived_from_users() {
        let backend = InMemoryBackend::new();
        let group = seed_group(&backend, "Biology").await;
        let bruno = seed_user(&backend, "Bruno").await;
        let ana = seed_user(&backend, "Ana").await;
        backend.assign_group(bruno.id, None, Some(group.id)).await.unwrap();
        backend.assign_group(ana.id, None, Some(group.id)).await.unwrap();

        let loaded = backend.get_group(group.id).await.unwrap().unwrap();
        assert_eq!(loaded.members, vec![ana.id, bruno.id]);
    }

    #[tokio::test]
    async fn test_delete_group_releases_members() {
        let backend = InMemoryBackend::new();
        let group = seed_group(&backend, "Biology").await;
        let ana = seed_user(&backend, "Ana").await;
        backend.assign_group(ana.id, None, Some(group.id)).await.unwrap();

        assert_eq!(backend.delete_group(group.id).await.unwrap(), Some(1));
        assert!(backend.get_user(ana.id).await.unwrap().unwrap().group_id.is_none());
        assert_eq!(backend.delete_group(group.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sessions_listed_newest_first() {
        let backend = InMemoryBackend::new();
        let ana = seed_user(&backend, "Ana").await;
        for studied_time in [10, 20, 30] {
            backend
                .create_session(&NewStudySession {
                    user_id: ana.id,
                    studied_time,
                    location: None,
                    image: None,
                })
                .await
                .unwrap();
        }
        let sessions = backend.list_sessions(ana.id).await.unwrap();
        let times: Vec<u64> = sessions.iter().map(|s| s.studied_time).collect();
        assert_eq!(times, vec![30, 20, 10]);

        let totals = backend.session_totals(&[ana.id]).await.unwrap();
        assert_eq!(totals.get(&ana.id), Some(&(3, 60)));
    }

    #[tokio::test]
    async fn test_auth_round_trip() {
        let backend = InMemoryBackend::new();
        let mut events = backend.subscribe();

        let user_id = backend.sign_up("ana@example.com", "secret1").await.unwrap();
        assert!(matches!(
            backend.sign_up("ana@example.com", "other12").await,
            Err(BackendError::Duplicate(_))
        ));
        assert!(matches!(
            backend.sign_in("ana@example.com", "wrong").await,
            Err(BackendError::InvalidCredentials)
        ));

        let session = backend.sign_in("ana@example.com", "secret1").await.unwrap();
        assert_eq!(session.user_id, user_id);
        assert!(backend.is_session_active(session.id).await.unwrap());

        backend.sign_out(session.id).await.unwrap();
        assert!(!backend.is_session_active(session.id).await.unwrap());
        // Second sign-out is a no-op.
        backend.sign_out(session.id).await.unwrap();

        assert_eq!(events.recv().await.unwrap().kind(), "signed_up");
        assert_eq!(events.recv().await.unwrap().kind(), "signed_in");
        assert_eq!(events.recv().await.unwrap().kind(), "signed_out");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let backend = InMemoryBackend::new();
        backend.set_unavailable(true);
        assert!(matches!(
            backend.list_groups().await,
            Err(BackendError::Unavailable(_))
        ));
        assert!(backend.ping().await.is_err());
        backend.set_unavailable(false);
        assert!(backend.ping().await.is_ok());
    }
}
