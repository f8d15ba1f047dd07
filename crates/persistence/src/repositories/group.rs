//! Group repository for database operations.

use std::collections::HashMap;

use async_trait::async_trait;
use domain::models::{Group, GroupPatch, NewGroup};
use domain::ports::GroupStore;
use domain::BackendError;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::entities::{GroupEntity, GroupMemberRow};
use crate::error::backend_error;
use crate::metrics::QueryTimer;

/// Repository for group-related database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Creates a new GroupRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, name: &str, created_by: Uuid) -> Result<GroupEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_group");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO groups (name, created_by)
            VALUES ($1, $2)
            RETURNING id, name, created_by, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, created_by, created_at, updated_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Member ids of one group, ordered by name then id.
    pub async fn member_ids(&self, group_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_member_ids");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM users
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

    pub async fn rename(
        &self,
        id: Uuid,
        name: Option<&str>,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_group");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Deletes a group and clears the pointer of its members in one
    /// transaction. Returns `None` if the group does not exist.
    pub async fn delete_releasing_members(&self, id: Uuid) -> Result<Option<u64>, sqlx::Error> {
        let timer = QueryTimer::new("delete_group");
        let mut tx = self.pool.begin().await?;

        // Row lock blocks concurrent joins, whose FK check needs a share lock.
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM groups WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        }

        let released = sqlx::query(
            r#"
            UPDATE users
            SET group_id = NULL,
                updated_at = NOW()
            WHERE group_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(released))
    }

    pub async fn find_all(&self) -> Result<Vec<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_groups");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, created_by, created_at, updated_at
            FROM groups
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Every `(group, member)` pair, ordered by member name then id.
    pub async fn all_memberships(&self) -> Result<Vec<GroupMemberRow>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_memberships");
        let result = sqlx::query_as::<_, GroupMemberRow>(
            r#"
            SELECT group_id, id AS user_id
            FROM users
            WHERE group_id IS NOT NULL
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    async fn load(&self, entity: GroupEntity) -> Result<Group, sqlx::Error> {
        let members = self.member_ids(entity.id).await?;
        Ok(entity.into_group(members))
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn create_group(&self, group: &NewGroup) -> Result<Group, BackendError> {
        let entity = self
            .insert(&group.name, group.created_by)
            .await
            .map_err(backend_error)?;
        Ok(entity.into_group(Vec::new()))
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<Group>, BackendError> {
        match self.find_by_id(id).await.map_err(backend_error)? {
            Some(entity) => Ok(Some(self.load(entity).await.map_err(backend_error)?)),
            None => Ok(None),
        }
    }

    async fn update_group(
        &self,
        id: Uuid,
        patch: &GroupPatch,
    ) -> Result<Option<Group>, BackendError> {
        match self
            .rename(id, patch.name.as_deref())
            .await
            .map_err(backend_error)?
        {
            Some(entity) => Ok(Some(self.load(entity).await.map_err(backend_error)?)),
            None => Ok(None),
        }
    }

    async fn delete_group(&self, id: Uuid) -> Result<Option<u64>, BackendError> {
        let released = self
            .delete_releasing_members(id)
            .await
            .map_err(backend_error)?;
        if let Some(count) = released {
            info!(group_id = %id, released_members = count, "Group row deleted");
        }
        Ok(released)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, BackendError> {
        let groups = self.find_all().await.map_err(backend_error)?;
        let memberships = self.all_memberships().await.map_err(backend_error)?;

        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in memberships {
            members.entry(row.group_id).or_default().push(row.user_id);
        }

        Ok(groups
            .into_iter()
            .map(|entity| {
                let ids = members.remove(&entity.id).unwrap_or_default();
                entity.into_group(ids)
            })
            .collect())
    }
}
