//! Domain models for Study Groups.

pub mod group;
pub mod ranking;
pub mod study_session;
pub mod user;

pub use group::{Group, GroupPatch, NewGroup};
pub use ranking::{GroupRanking, MemberTotal, RankingEntry, UserStudySummary};
pub use study_session::{GeoPoint, NewStudySession, StudySession};
pub use user::{AuthEvent, AuthSession, Role, User, UserPatch};
