//! Group entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the groups table.
///
/// Members are not a column; they come from `users.group_id`.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupEntity {
    pub fn into_group(self, members: Vec<Uuid>) -> domain::models::Group {
        domain::models::Group {
            id: self.id,
            name: self.name,
            created_by: self.created_by,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A `(group_id, user_id)` pair read from users with a group.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberRow {
    pub group_id: Uuid,
    pub user_id: Uuid,
}
