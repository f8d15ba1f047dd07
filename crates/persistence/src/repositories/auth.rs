//! Credential and auth session repository.

use async_trait::async_trait;
use domain::models::{AuthEvent, AuthSession};
use domain::ports::{AuthEventHub, AuthProvider};
use domain::BackendError;
use shared::password::{hash_password, verify_password};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::entities::{AccountEntity, AuthSessionEntity};
use crate::error::backend_error;
use crate::metrics::QueryTimer;

/// Email/password accounts and their sessions.
///
/// Auth events are published to subscribers of this process only.
#[derive(Clone)]
pub struct AuthRepository {
    pool: PgPool,
    events: AuthEventHub,
}

impl AuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            events: AuthEventHub::new(),
        }
    }

    pub async fn insert_account(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_account");
        let result = sqlx::query_as::<_, AccountEntity>(
            r#"
            INSERT INTO accounts (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_account_by_email");
        let result = sqlx::query_as::<_, AccountEntity>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn insert_session(&self, user_id: Uuid) -> Result<AuthSessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_auth_session");
        let result = sqlx::query_as::<_, AuthSessionEntity>(
            r#"
            INSERT INTO auth_sessions (user_id)
            VALUES ($1)
            RETURNING id, user_id, created_at, revoked_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks a session revoked. Returns the row only if it was active.
    pub async fn revoke_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<AuthSessionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("revoke_auth_session");
        let result = sqlx::query_as::<_, AuthSessionEntity>(
            r#"
            UPDATE auth_sessions
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            RETURNING id, user_id, created_at, revoked_at
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<AuthSessionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_auth_session");
        let result = sqlx::query_as::<_, AuthSessionEntity>(
            r#"
            SELECT id, user_id, created_at, revoked_at
            FROM auth_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl AuthProvider for AuthRepository {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, BackendError> {
        let password_hash =
            hash_password(password).map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let account = self
            .insert_account(email, &password_hash)
            .await
            .map_err(|e| match backend_error(e) {
                BackendError::Duplicate(_) => BackendError::Duplicate("email".to_string()),
                other => other,
            })?;
        self.events.publish(AuthEvent::SignedUp {
            user_id: account.id,
        });
        Ok(account.id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let account = self
            .find_account_by_email(email)
            .await
            .map_err(backend_error)?
            .ok_or(BackendError::InvalidCredentials)?;

        let valid = verify_password(password, &account.password_hash).map_err(|e| {
            warn!(account_id = %account.id, error = %e, "Stored password hash unreadable");
            BackendError::InvalidCredentials
        })?;
        if !valid {
            return Err(BackendError::InvalidCredentials);
        }

        let session: AuthSession = self
            .insert_session(account.id)
            .await
            .map_err(backend_error)?
            .into();
        self.events.publish(AuthEvent::SignedIn {
            user_id: session.user_id,
            session_id: session.id,
        });
        Ok(session)
    }

    async fn sign_out(&self, session_id: Uuid) -> Result<(), BackendError> {
        if let Some(revoked) = self.revoke_session(session_id).await.map_err(backend_error)? {
            self.events.publish(AuthEvent::SignedOut {
                user_id: revoked.user_id,
                session_id,
            });
        }
        Ok(())
    }

    async fn is_session_active(&self, session_id: Uuid) -> Result<bool, BackendError> {
        let session = self.find_session(session_id).await.map_err(backend_error)?;
        Ok(session.is_some_and(|s| s.is_active()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
