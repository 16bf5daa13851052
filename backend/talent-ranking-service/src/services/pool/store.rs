use crate::models::{Candidate, CandidateStatus, RankingRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("candidate not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Query surface over persisted candidates. The ranking engine reads pools
/// through it and writes back exactly one ranking result per candidate per run.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Active candidates for a role, newest upload first
    async fn list_active(&self, role_id: &str) -> Result<Vec<Candidate>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Candidate>>;

    /// Store the computed rank and scores on the candidate
    async fn save_ranking_result(&self, record: &RankingRecord) -> Result<()>;

    /// Store every record of one run, or none of them.
    ///
    /// The default checks all ids up front and then saves one at a time;
    /// backends with transactions should override it.
    async fn save_ranking_results(&self, records: &[RankingRecord]) -> Result<()> {
        for record in records {
            if self.get_by_id(&record.candidate_id).await?.is_none() {
                return Err(StoreError::NotFound(record.candidate_id.clone()));
            }
        }
        for record in records {
            self.save_ranking_result(record).await?;
        }
        Ok(())
    }
}

/// Candidate store kept in process memory
#[derive(Default)]
pub struct InMemoryCandidateStore {
    candidates: RwLock<HashMap<String, Candidate>>,
}

impl InMemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        Self {
            candidates: RwLock::new(
                candidates
                    .into_iter()
                    .map(|c| (c.id.clone(), c))
                    .collect(),
            ),
        }
    }

    pub async fn insert(&self, candidate: Candidate) {
        let mut candidates = self.candidates.write().await;
        candidates.insert(candidate.id.clone(), candidate);
    }

    pub async fn len(&self) -> usize {
        self.candidates.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.candidates.read().await.is_empty()
    }
}

#[async_trait]
impl CandidateStore for InMemoryCandidateStore {
    async fn list_active(&self, role_id: &str) -> Result<Vec<Candidate>> {
        let candidates = self.candidates.read().await;

        let mut active: Vec<Candidate> = candidates
            .values()
            .filter(|c| c.role_id == role_id && c.status == CandidateStatus::Active)
            .cloned()
            .collect();

        active.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(role_id = %role_id, count = active.len(), "Listed active candidates");
        Ok(active)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Candidate>> {
        Ok(self.candidates.read().await.get(id).cloned())
    }

    async fn save_ranking_result(&self, record: &RankingRecord) -> Result<()> {
        let mut candidates = self.candidates.write().await;

        let candidate = candidates
            .get_mut(&record.candidate_id)
            .ok_or_else(|| StoreError::NotFound(record.candidate_id.clone()))?;

        candidate.ranking = Some(record.clone());
        Ok(())
    }

    async fn save_ranking_results(&self, records: &[RankingRecord]) -> Result<()> {
        let mut candidates = self.candidates.write().await;

        if let Some(missing) = records
            .iter()
            .find(|r| !candidates.contains_key(&r.candidate_id))
        {
            return Err(StoreError::NotFound(missing.candidate_id.clone()));
        }

        for record in records {
            if let Some(candidate) = candidates.get_mut(&record.candidate_id) {
                candidate.ranking = Some(record.clone());
            }
        }

        debug!(count = records.len(), "Saved ranking results");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Evaluation, ScoreMap};
    use chrono::{Duration, Utc};
    use tokio_test::{assert_err, assert_ok, block_on};

    fn candidate(id: &str, role_id: &str, age_minutes: i64) -> Candidate {
        let mut c = Candidate::new(id, role_id);
        c.uploaded_at = Utc::now() - Duration::minutes(age_minutes);
        c
    }

    fn record(candidate_id: &str) -> RankingRecord {
        RankingRecord {
            candidate_id: candidate_id.to_string(),
            name: "Test".to_string(),
            rank: 1,
            match_score: 70,
            scores: ScoreMap::uniform(70),
            summary: vec!["Strong".to_string()],
            why_selected: "See scores for details".to_string(),
            compared_to_pool: String::new(),
            tie_breaker_applied: false,
            tie_breaker_reason: None,
            evaluation: Evaluation::Scored,
        }
    }

    #[tokio::test]
    async fn test_list_active_filters_and_orders() {
        let mut archived = candidate("c-4", "role-a", 1);
        archived.status = CandidateStatus::Archived;

        let store = InMemoryCandidateStore::with_candidates(vec![
            candidate("c-1", "role-a", 30),
            candidate("c-2", "role-a", 5),
            candidate("c-3", "role-b", 1),
            archived,
        ]);

        let ids: Vec<String> = store
            .list_active("role-a")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(ids, vec!["c-2", "c-1"]);
        assert!(store.list_active("role-z").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_ranking_result() {
        let store = InMemoryCandidateStore::new();
        store.insert(candidate("c-1", "role-a", 0)).await;

        store.save_ranking_result(&record("c-1")).await.unwrap();
        let saved = store.get_by_id("c-1").await.unwrap().unwrap();
        assert_eq!(saved.ranking.unwrap().match_score, 70);

        let err = store.save_ranking_result(&record("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn test_save_ranking_results_is_all_or_nothing() {
        let store = InMemoryCandidateStore::new();
        block_on(store.insert(candidate("c-1", "role-a", 0)));
        block_on(store.insert(candidate("c-2", "role-a", 0)));

        let err = assert_err!(block_on(
            store.save_ranking_results(&[record("c-1"), record("gone"), record("c-2")])
        ));
        assert!(matches!(err, StoreError::NotFound(id) if id == "gone"));

        let c1 = assert_ok!(block_on(store.get_by_id("c-1")));
        assert!(c1.and_then(|c| c.ranking).is_none());

        assert_ok!(block_on(
            store.save_ranking_results(&[record("c-1"), record("c-2")])
        ));
        let c2 = assert_ok!(block_on(store.get_by_id("c-2")));
        assert_eq!(c2.and_then(|c| c.ranking).map(|r| r.match_score), Some(70));
    }
}
