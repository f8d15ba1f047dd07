//! Study-time aggregation and group ranking.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{GroupRanking, MemberTotal, RankingEntry, StudySession, UserStudySummary};
use crate::ports::{GroupStore, StudySessionStore, UserStore};

/// Sum of `studied_time` over the given sessions. Zero for no sessions.
pub fn total_studied_time(sessions: &[StudySession]) -> u64 {
    sessions
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.studied_time))
}

fn ranking_order(a: &MemberTotal, b: &MemberTotal) -> Ordering {
    b.total_time_studied
        .cmp(&a.total_time_studied)
        .then_with(|| a.user_name.cmp(&b.user_name))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Orders members by total descending, then name, then id. The first entry
/// is the leader.
pub fn rank_members(mut totals: Vec<MemberTotal>) -> Vec<RankingEntry> {
    totals.sort_by(ranking_order);
    totals
        .into_iter()
        .enumerate()
        .map(|(index, member)| RankingEntry {
            position: index + 1,
            user_id: member.user_id,
            user_name: member.user_name,
            total_time_studied: member.total_time_studied,
            is_leader: index == 0,
        })
        .collect()
}

pub fn leader(ranking: &[RankingEntry]) -> Option<&RankingEntry> {
    ranking.first()
}

/// Reads members and sessions through the ports and ranks them.
#[derive(Clone)]
pub struct RankingService {
    users: Arc<dyn UserStore>,
    groups: Arc<dyn GroupStore>,
    sessions: Arc<dyn StudySessionStore>,
}

impl RankingService {
    pub fn new(
        users: Arc<dyn UserStore>,
        groups: Arc<dyn GroupStore>,
        sessions: Arc<dyn StudySessionStore>,
    ) -> Self {
        Self {
            users,
            groups,
            sessions,
        }
    }

    pub async fn group_ranking(&self, group_id: Uuid) -> Result<GroupRanking, DomainError> {
        let group = self
            .groups
            .get_group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Group {} not found", group_id)))?;

        let members = self.users.list_group_members(group_id).await?;
        let ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();
        let totals = self.sessions.session_totals(&ids).await?;

        let entries = rank_members(
            members
                .into_iter()
                .map(|member| MemberTotal {
                    total_time_studied: totals.get(&member.id).map(|t| t.1).unwrap_or(0),
                    user_id: member.id,
                    user_name: member.name,
                })
                .collect(),
        );

        debug!(group_id = %group_id, members = entries.len(), "Computed group ranking");

        Ok(GroupRanking {
            group_id,
            group_name: group.name,
            leader: leader(&entries).map(|e| e.user_id),
            entries,
        })
    }

    pub async fn user_summary(&self, user_id: Uuid) -> Result<UserStudySummary, DomainError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", user_id)))?;

        let totals = self.sessions.session_totals(&[user_id]).await?;
        let (session_count, total_time_studied) =
            totals.get(&user_id).copied().unwrap_or((0, 0));

        Ok(UserStudySummary {
            user_id,
            group_id: user.group_id,
            session_count,
            total_time_studied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewGroup, NewStudySession, Role, User};
    use crate::ports::InMemoryBackend;
    use chrono::Utc;

    fn session(studied_time: u64) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            studied_time,
            location: None,
            image: None,
            created_at: Utc::now(),
        }
    }

    fn total(name: &str, seconds: u64) -> MemberTotal {
        MemberTotal {
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
            total_time_studied: seconds,
        }
    }

    #[test]
    fn test_total_of_empty_is_zero() {
        assert_eq!(total_studied_time(&[]), 0);
    }

    #[test]
    fn test_total_sums_sessions() {
        let sessions = vec![session(1200), session(0), session(600)];
        assert_eq!(total_studied_time(&sessions), 1800);
    }

    #[test]
    fn test_total_saturates() {
        let sessions = vec![session(u64::MAX), session(10)];
        assert_eq!(total_studied_time(&sessions), u64::MAX);
    }

    #[test]
    fn test_rank_is_sorted_permutation() {
        let input = vec![
            total("Carla", 300),
            total("Ana", 1200),
            total("Bruno", 0),
            total("Davi", 900),
        ];
        let mut expected_ids: Vec<Uuid> = input.iter().map(|m| m.user_id).collect();

        let ranking = rank_members(input);

        let totals: Vec<u64> = ranking.iter().map(|e| e.total_time_studied).collect();
        assert_eq!(totals, vec![1200, 900, 300, 0]);
        let mut ids: Vec<Uuid> = ranking.iter().map(|e| e.user_id).collect();
        ids.sort();
        expected_ids.sort();
        assert_eq!(ids, expected_ids);

        let positions: Vec<usize> = ranking.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert!(ranking[0].is_leader);
        assert!(ranking[1..].iter().all(|e| !e.is_leader));
    }

    #[test]
    fn test_ties_break_by_name() {
        let ranking = rank_members(vec![total("Zoe", 100), total("Ana", 100)]);
        assert_eq!(ranking[0].user_name, "Ana");
        assert!(ranking[0].is_leader);
    }

    #[test]
    fn test_empty_group_has_no_leader() {
        let ranking = rank_members(Vec::new());
        assert!(ranking.is_empty());
        assert!(leader(&ranking).is_none());
    }

    #[test]
    fn test_leader_with_zero_total() {
        let ranking = rank_members(vec![total("Ana", 0)]);
        assert_eq!(leader(&ranking).map(|e| e.user_name.as_str()), Some("Ana"));
    }

    async fn add_member(backend: &InMemoryBackend, group_id: Uuid, name: &str) -> Uuid {
        let user = User::new_profile(
            Uuid::new_v4(),
            name,
            &format!("{}@example.com", name.to_lowercase()),
            Role::Student,
        );
        backend.set_user(&user).await.unwrap();
        backend
            .assign_group(user.id, None, Some(group_id))
            .await
            .unwrap();
        user.id
    }

    async fn log(backend: &InMemoryBackend, user_id: Uuid, studied_time: u64) {
        backend
            .create_session(&NewStudySession {
                user_id,
                studied_time,
                location: None,
                image: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_biology_group_ranking() {
        let backend = Arc::new(InMemoryBackend::new());
        let group = backend
            .create_group(&NewGroup {
                name: "Biology".to_string(),
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap();

        let a = add_member(&backend, group.id, "A").await;
        let b = add_member(&backend, group.id, "B").await;
        log(&backend, a, 1800).await;
        log(&backend, a, 1800).await;
        log(&backend, b, 5400).await;

        let service = RankingService::new(backend.clone(), backend.clone(), backend.clone());
        let ranking = service.group_ranking(group.id).await.unwrap();

        assert_eq!(ranking.group_name, "Biology");
        assert_eq!(ranking.leader, Some(b));
        let rows: Vec<(Uuid, u64, bool)> = ranking
            .entries
            .iter()
            .map(|e| (e.user_id, e.total_time_studied, e.is_leader))
            .collect();
        assert_eq!(rows, vec![(b, 5400, true), (a, 3600, false)]);
    }

    #[tokio::test]
    async fn test_ranking_of_missing_group() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = RankingService::new(backend.clone(), backend.clone(), backend);
        let result = service.group_ranking(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_group_ranking() {
        let backend = Arc::new(InMemoryBackend::new());
        let group = backend
            .create_group(&NewGroup {
                name: "Empty".to_string(),
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
        let service = RankingService::new(backend.clone(), backend.clone(), backend);
        let ranking = service.group_ranking(group.id).await.unwrap();
        assert!(ranking.entries.is_empty());
        assert!(ranking.leader.is_none());
    }

    #[tokio::test]
    async fn test_user_summary() {
        let backend = Arc::new(InMemoryBackend::new());
        let group = backend
            .create_group(&NewGroup {
                name: "Biology".to_string(),
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
        let ana = add_member(&backend, group.id, "Ana").await;
        log(&backend, ana, 100).await;
        log(&backend, ana, 50).await;

        let service = RankingService::new(backend.clone(), backend.clone(), backend);
        let summary = service.user_summary(ana).await.unwrap();
        assert_eq!(summary.session_count, 2);
        assert_eq!(summary.total_time_studied, 150);
        assert_eq!(summary.group_id, Some(group.id));
    }
}
