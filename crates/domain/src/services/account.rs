//! Account registration, role-checked sign-in and profile updates.

use std::sync::Arc;

use serde::Deserialize;
use shared::password::check_password_length;
use shared::validation::{normalize_email, validate_name};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::{AuthEvent, AuthSession, Role, User, UserPatch};
use crate::ports::{AuthProvider, UserStore};

/// Registration input.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SignUpInput {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub role: Role,
}

/// Profile update input.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateProfileInput {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
}

/// A signed-in user and the session backing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub user: User,
    pub session: AuthSession,
}

#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthProvider>,
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthProvider>, users: Arc<dyn UserStore>) -> Self {
        Self { auth, users }
    }

    /// Registers credentials, writes the profile and opens a session.
    pub async fn sign_up(&self, input: SignUpInput) -> Result<SignedIn, DomainError> {
        input.validate()?;
        check_password_length(&input.password)
            .map_err(|e| DomainError::Validation(format!("password: {}", e)))?;
        let email = normalize_email(&input.email);

        let user_id = self.auth.sign_up(&email, &input.password).await?;
        let user = User::new_profile(user_id, &input.name, &email, input.role);
        if let Err(e) = self.users.set_user(&user).await {
            warn!(
                user_id = %user_id,
                error = %e,
                "Account created without a profile; remove it before the email can register again"
            );
            return Err(e.into());
        }
        info!(user_id = %user_id, role = %user.role, "Account registered");

        let session = self.auth.sign_in(&email, &input.password).await?;
        Ok(SignedIn { user, session })
    }

    /// Authenticates and checks that the account has `expected_role`.
    ///
    /// When the profile is missing or its role differs, the session just
    /// opened is revoked before the error is returned.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        expected_role: Role,
    ) -> Result<SignedIn, DomainError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(DomainError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        let email = normalize_email(email);
        let session = self.auth.sign_in(&email, password).await?;

        let user = match self.users.get_user(session.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.revoke(&session).await;
                return Err(DomainError::NotFound(format!(
                    "Profile for user {} not found",
                    session.user_id
                )));
            }
            Err(e) => {
                self.revoke(&session).await;
                return Err(e.into());
            }
        };

        if user.role != expected_role {
            self.revoke(&session).await;
            warn!(
                user_id = %user.id,
                role = %user.role,
                expected = %expected_role,
                "Sign-in rejected: role mismatch"
            );
            return Err(DomainError::Permission(format!(
                "Account is not registered as {}",
                expected_role
            )));
        }

        info!(user_id = %user.id, session_id = %session.id, "User signed in");
        Ok(SignedIn { user, session })
    }

    async fn revoke(&self, session: &AuthSession) {
        if let Err(e) = self.auth.sign_out(session.id).await {
            warn!(session_id = %session.id, error = %e, "Failed to revoke rejected session");
        }
    }

    pub async fn sign_out(&self, session_id: Uuid) -> Result<(), DomainError> {
        self.auth.sign_out(session_id).await?;
        info!(session_id = %session_id, "User signed out");
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    /// Resolves the user behind an active session.
    pub async fn authenticate_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<User>, DomainError> {
        if !self.auth.is_session_active(session_id).await? {
            return Ok(None);
        }
        Ok(self.users.get_user(user_id).await?)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn rename(&self, user_id: Uuid, input: UpdateProfileInput) -> Result<User, DomainError> {
        input.validate()?;
        let patch = UserPatch {
            name: Some(input.name.trim().to_string()),
        };
        self.users
            .update_user(user_id, &patch)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", user_id)))
    }
}
