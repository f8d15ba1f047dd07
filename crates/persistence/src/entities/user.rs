//! User profile and credential entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{AuthSession, Role};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for user_role that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum RoleDb {
    Admin,
    Student,
}

impl From<RoleDb> for Role {
    fn from(db_role: RoleDb) -> Self {
        match db_role {
            RoleDb::Admin => Role::Admin,
            RoleDb::Student => Role::Student,
        }
    }
}

impl From<Role> for RoleDb {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => RoleDb::Admin,
            Role::Student => RoleDb::Student,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: RoleDb,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for domain::models::User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            role: entity.role.into(),
            group_id: entity.group_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the accounts table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Database row mapping for the auth_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct AuthSessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AuthSessionEntity {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

impl From<AuthSessionEntity> for AuthSession {
    fn from(entity: AuthSessionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        assert_eq!(Role::from(RoleDb::Admin), Role::Admin);
        assert_eq!(RoleDb::from(Role::Student), RoleDb::Student);
    }

    #[test]
    fn test_user_entity_into_domain() {
        let group_id = Uuid::new_v4();
        let entity = UserEntity {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role: RoleDb::Student,
            group_id: Some(group_id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let user: domain::models::User = entity.into();
        assert_eq!(user.role, Role::Student);
        assert!(user.is_member_of(group_id));
    }

    #[test]
    fn test_auth_session_active() {
        let mut entity = AuthSessionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            revoked_at: None,
        };
        assert!(entity.is_active());
        entity.revoked_at = Some(Utc::now());
        assert!(!entity.is_active());
    }
}
