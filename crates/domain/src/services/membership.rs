//! Group lifecycle and one-group-per-user membership.
//!
//! Membership is stored only as the user's `group_id`. Join and leave are a
//! single compare-and-set on that pointer, so concurrent requests cannot
//! leave a user in two groups or in a group that does not list them.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::group::{CreateGroupRequest, RenameGroupRequest};
use crate::models::{Group, GroupPatch, NewGroup, User};
use crate::ports::{GroupStore, UserStore};

#[derive(Clone)]
pub struct GroupMembershipManager {
    users: Arc<dyn UserStore>,
    groups: Arc<dyn GroupStore>,
}

impl GroupMembershipManager {
    pub fn new(users: Arc<dyn UserStore>, groups: Arc<dyn GroupStore>) -> Self {
        Self { users, groups }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", user_id)))
    }

    async fn require_admin(&self, user_id: Uuid) -> Result<User, DomainError> {
        let user = self.load_user(user_id).await?;
        if !user.role.can_manage_groups() {
            return Err(DomainError::Permission(
                "Only administrators can manage groups".to_string(),
            ));
        }
        Ok(user)
    }

    async fn require_group(&self, group_id: Uuid) -> Result<Group, DomainError> {
        self.groups
            .get_group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Group {} not found", group_id)))
    }

    /// Creates an empty group. The name is validated before any backend call.
    pub async fn create(&self, admin_id: Uuid, name: &str) -> Result<Group, DomainError> {
        CreateGroupRequest {
            name: name.to_string(),
        }
        .validate()?;
        self.require_admin(admin_id).await?;

        let group = self
            .groups
            .create_group(&NewGroup {
                name: name.trim().to_string(),
                created_by: admin_id,
            })
            .await?;

        info!(group_id = %group.id, admin_id = %admin_id, name = %group.name, "Group created");
        Ok(group)
    }

    pub async fn rename(
        &self,
        admin_id: Uuid,
        group_id: Uuid,
        new_name: &str,
    ) -> Result<Group, DomainError> {
        RenameGroupRequest {
            name: new_name.to_string(),
        }
        .validate()?;
        self.require_admin(admin_id).await?;

        let patch = GroupPatch {
            name: Some(new_name.trim().to_string()),
        };
        let group = self
            .groups
            .update_group(group_id, &patch)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Group {} not found", group_id)))?;

        info!(group_id = %group_id, admin_id = %admin_id, "Group renamed");
        Ok(group)
    }

    /// Deletes a group and releases its members. Returns how many members
    /// were released.
    pub async fn delete(&self, admin_id: Uuid, group_id: Uuid) -> Result<u64, DomainError> {
        self.require_admin(admin_id).await?;

        let released = self
            .groups
            .delete_group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Group {} not found", group_id)))?;

        info!(
            group_id = %group_id,
            admin_id = %admin_id,
            released_members = released,
            "Group deleted"
        );
        Ok(released)
    }

    pub async fn get(&self, group_id: Uuid) -> Result<Group, DomainError> {
        self.require_group(group_id).await
    }

    pub async fn list(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.groups.list_groups().await?)
    }

    /// Puts a student into a group. The student must not already belong to
    /// any group; switching requires an explicit leave first.
    pub async fn join(&self, user_id: Uuid, group_id: Uuid) -> Result<Group, DomainError> {
        let user = self.load_user(user_id).await?;
        if !user.role.can_study() {
            return Err(DomainError::Permission(
                "Only students can join groups".to_string(),
            ));
        }
        self.require_group(group_id).await?;

        match user.group_id {
            Some(current) if current == group_id => {
                return Err(DomainError::Conflict(
                    "User is already a member of this group".to_string(),
                ));
            }
            Some(_) => {
                return Err(DomainError::Conflict(
                    "User already belongs to another group; leave it first".to_string(),
                ));
            }
            None => {}
        }

        if !self
            .users
            .assign_group(user_id, None, Some(group_id))
            .await?
        {
            warn!(user_id = %user_id, group_id = %group_id, "Concurrent membership change on join");
            return Err(DomainError::Conflict(
                "Membership changed concurrently; retry".to_string(),
            ));
        }

        info!(user_id = %user_id, group_id = %group_id, "User joined group");
        self.require_group(group_id).await
    }

    /// Removes a user from the group they belong to.
    pub async fn leave(&self, user_id: Uuid, group_id: Uuid) -> Result<(), DomainError> {
        let user = self.load_user(user_id).await?;
        if user.group_id != Some(group_id) {
            return Err(DomainError::Conflict(
                "User is not a member of this group".to_string(),
            ));
        }

        if !self
            .users
            .assign_group(user_id, Some(group_id), None)
            .await?
        {
            warn!(user_id = %user_id, group_id = %group_id, "Concurrent membership change on leave");
            return Err(DomainError::Conflict(
                "User is not a member of this group".to_string(),
            ));
        }

        info!(user_id = %user_id, group_id = %group_id, "User left group");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::ports::InMemoryBackend;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        manager: GroupMembershipManager,
        admin: Uuid,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let admin = User::new_profile(Uuid::new_v4(), "Admin", "admin@example.com", Role::Admin);
        backend.set_user(&admin).await.unwrap();
        let manager = GroupMembershipManager::new(backend.clone(), backend.clone());
        Fixture {
            backend,
            manager,
            admin: admin.id,
        }
    }

    async fn student(backend: &InMemoryBackend, name: &str) -> Uuid {
        let user = User::new_profile(
            Uuid::new_v4(),
            name,
            &format!("{}@example.com", name.to_lowercase()),
            Role::Student,
        );
        backend.set_user(&user).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_create_group() {
        let f = fixture().await;
        let group = f.manager.create(f.admin, "  Biology ").await.unwrap();
        assert_eq!(group.name, "Biology");
        assert_eq!(group.created_by, f.admin);
        assert!(group.members.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_empty_name_creates_nothing() {
        let f = fixture().await;
        for name in ["", "   "] {
            let result = f.manager.create(f.admin, name).await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
        assert_eq!(f.backend.group_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_precedes_backend_calls() {
        let f = fixture().await;
        f.backend.set_unavailable(true);
        let result = f.manager.create(f.admin, "").await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_students_cannot_manage_groups() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        let result = f.manager.create(ana, "Biology").await;
        assert!(matches!(result, Err(DomainError::Permission(_))));

        let group = f.manager.create(f.admin, "Biology").await.unwrap();
        assert!(matches!(
            f.manager.rename(ana, group.id, "Chem").await,
            Err(DomainError::Permission(_))
        ));
        assert!(matches!(
            f.manager.delete(ana, group.id).await,
            Err(DomainError::Permission(_))
        ));
    }

    #[tokio::test]
    async fn test_rename() {
        let f = fixture().await;
        let group = f.manager.create(f.admin, "Biology").await.unwrap();
        let renamed = f.manager.rename(f.admin, group.id, "Chemistry").await.unwrap();
        assert_eq!(renamed.name, "Chemistry");

        assert!(matches!(
            f.manager.rename(f.admin, group.id, "").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            f.manager.rename(f.admin, Uuid::new_v4(), "Physics").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_join_then_leave_restores_state() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        let group = f.manager.create(f.admin, "Biology").await.unwrap();

        let joined = f.manager.join(ana, group.id).await.unwrap();
        assert!(joined.has_member(ana));
        let user = f.backend.get_user(ana).await.unwrap().unwrap();
        assert_eq!(user.group_id, Some(group.id));

        f.manager.leave(ana, group.id).await.unwrap();
        let user = f.backend.get_user(ana).await.unwrap().unwrap();
        assert!(user.group_id.is_none());
        let group = f.manager.get(group.id).await.unwrap();
        assert!(!group.has_member(ana));
    }

    #[tokio::test]
    async fn test_join_second_group_conflicts() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        let g1 = f.manager.create(f.admin, "Biology").await.unwrap();
        let g2 = f.manager.create(f.admin, "Chemistry").await.unwrap();

        f.manager.join(ana, g1.id).await.unwrap();
        assert!(matches!(
            f.manager.join(ana, g1.id).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            f.manager.join(ana, g2.id).await,
            Err(DomainError::Conflict(_))
        ));

        let g1 = f.manager.get(g1.id).await.unwrap();
        let g2 = f.manager.get(g2.id).await.unwrap();
        assert_eq!(g1.members, vec![ana]);
        assert!(g2.members.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_joins_succeed_once() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        let g1 = f.manager.create(f.admin, "Biology").await.unwrap();
        let g2 = f.manager.create(f.admin, "Chemistry").await.unwrap();

        let (r1, r2) = tokio::join!(f.manager.join(ana, g1.id), f.manager.join(ana, g2.id));
        assert_eq!(r1.is_ok() as u8 + r2.is_ok() as u8, 1);

        let groups = f.manager.list().await.unwrap();
        let memberships: usize = groups.iter().filter(|g| g.has_member(ana)).count();
        assert_eq!(memberships, 1);
    }

    #[tokio::test]
    async fn test_admin_cannot_join() {
        let f = fixture().await;
        let group = f.manager.create(f.admin, "Biology").await.unwrap();
        assert!(matches!(
            f.manager.join(f.admin, group.id).await,
            Err(DomainError::Permission(_))
        ));
    }

    #[tokio::test]
    async fn test_join_missing_group() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        assert!(matches!(
            f.manager.join(ana, Uuid::new_v4()).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_leave_wrong_group_conflicts() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        let g1 = f.manager.create(f.admin, "Biology").await.unwrap();
        let g2 = f.manager.create(f.admin, "Chemistry").await.unwrap();
        f.manager.join(ana, g1.id).await.unwrap();

        assert!(matches!(
            f.manager.leave(ana, g2.id).await,
            Err(DomainError::Conflict(_))
        ));
        let user = f.backend.get_user(ana).await.unwrap().unwrap();
        assert_eq!(user.group_id, Some(g1.id));
    }

    #[tokio::test]
    async fn test_delete_releases_members() {
        let f = fixture().await;
        let ana = student(&f.backend, "Ana").await;
        let bruno = student(&f.backend, "Bruno").await;
        let group = f.manager.create(f.admin, "Biology").await.unwrap();
        f.manager.join(ana, group.id).await.unwrap();
        f.manager.join(bruno, group.id).await.unwrap();

        assert_eq!(f.manager.delete(f.admin, group.id).await.unwrap(), 2);
        for id in [ana, bruno] {
            assert!(f.backend.get_user(id).await.unwrap().unwrap().group_id.is_none());
        }
        assert!(matches!(
            f.manager.get(group.id).await,
            Err(DomainError::NotFound(_))
        ));

        // Released members can join another group.
        let other = f.manager.create(f.admin, "Chemistry").await.unwrap();
        assert!(f.manager.join(ana, other.id).await.is_ok());
    }
}
