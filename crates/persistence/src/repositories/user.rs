//! User profile repository.

use async_trait::async_trait;
use domain::models::{User, UserPatch};
use domain::ports::UserStore;
use domain::BackendError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{RoleDb, UserEntity};
use crate::error::backend_error;
use crate::metrics::QueryTimer;

/// Repository for user profiles and the membership pointer.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, name, email, role, group_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Inserts a profile or replaces name, email, role and group of an
    /// existing one.
    pub async fn upsert(&self, user: &User) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("upsert_user");
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, group_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                group_id = EXCLUDED.group_id,
                updated_at = NOW()
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(RoleDb::from(user.role))
        .bind(user.group_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn update_name(
        &self,
        id: Uuid,
        name: Option<&str>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, role, group_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Compare-and-set of `group_id`. Returns true if a row was updated.
    pub async fn compare_and_set_group(
        &self,
        user_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("assign_user_group");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET group_id = $3,
                updated_at = NOW()
            WHERE id = $1 AND group_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(user_id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected() == 1)
    }

    pub async fn find_by_group(&self, group_id: Uuid) -> Result<Vec<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_users_by_group");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, name, email, role, group_id, created_at, updated_at
            FROM users
            WHERE group_id = $1
            ORDER BY name, id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
        let entity = self.find_by_id(id).await.map_err(backend_error)?;
        Ok(entity.map(Into::into))
    }

    async fn set_user(&self, user: &User) -> Result<(), BackendError> {
        self.upsert(user).await.map_err(backend_error)
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, BackendError> {
        let entity = self
            .update_name(id, patch.name.as_deref())
            .await
            .map_err(backend_error)?;
        Ok(entity.map(Into::into))
    }

    async fn assign_group(
        &self,
        user_id: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, BackendError> {
        self.compare_and_set_group(user_id, expected, new)
            .await
            .map_err(backend_error)
    }

    async fn list_group_members(&self, group_id: Uuid) -> Result<Vec<User>, BackendError> {
        let entities = self.find_by_group(group_id).await.map_err(backend_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }
}
