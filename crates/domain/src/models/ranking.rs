//! Study-time ranking models. Derived on demand, never stored.

use serde::Serialize;
use uuid::Uuid;

/// A member's cumulative study time, the input to ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MemberTotal {
    pub user_id: Uuid,
    pub user_name: String,
    pub total_time_studied: u64,
}

/// One row of a group ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RankingEntry {
    /// 1-based position.
    pub position: usize,
    pub user_id: Uuid,
    pub user_name: String,
    pub total_time_studied: u64,
    pub is_leader: bool,
}

/// Ranking of a whole group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupRanking {
    pub group_id: Uuid,
    pub group_name: String,
    pub entries: Vec<RankingEntry>,
    pub leader: Option<Uuid>,
}

/// A user's own study totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserStudySummary {
    pub user_id: Uuid,
    pub group_id: Option<Uuid>,
    pub session_count: u64,
    pub total_time_studied: u64,
}
