//! Database entity definitions.

pub mod group;
pub mod study_session;
pub mod user;

pub use group::{GroupEntity, GroupMemberRow};
pub use study_session::{SessionTotalRow, StudySessionEntity};
pub use user::{AccountEntity, AuthSessionEntity, RoleDb, UserEntity};
