//! Study group domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::validate_name;
use uuid::Uuid;
use validator::Validate;

/// A study group.
///
/// `members` is derived from the users whose membership pointer names this
/// group; it is never written directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Fields for creating a group.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub name: String,
    pub created_by: Uuid,
}

/// Partial update of a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPatch {
    pub name: Option<String>,
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
}

/// Request payload for renaming a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RenameGroupRequest {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
}

/// Response for group listing and detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            created_by: group.created_by,
            member_count: group.members.len(),
            members: group.members,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

/// Response for listing groups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListGroupsResponse {
    pub data: Vec<GroupResponse>,
    pub count: usize,
}

/// Response after deleting a group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeleteGroupResponse {
    pub deleted: bool,
    pub group_id: Uuid,
    pub released_members: u64,
}

/// Response after a join or leave.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MembershipResponse {
    pub user_id: Uuid,
    pub group_id: Option<Uuid>,
}
