// ============================================
// Pool Assembler
// ============================================
//
// Loads the active candidates of a role from the candidate store and renders
// them for the scoring collaborator. Large pools are compressed: the first
// `max_detailed` candidates in full, the rest as one aggregate paragraph.

pub mod render;
pub mod store;

pub use render::{most_common_skills, render_candidate, render_pool, render_pool_compressed};
pub use store::{CandidateStore, InMemoryCandidateStore, StoreError};

use crate::config::PoolConfig;
use crate::models::Candidate;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Aggregate statistics for a pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    pub count: usize,
    /// `"<min>-<max> years"`, absent for an empty pool
    pub experience_range: Option<String>,
    pub common_skills: Vec<String>,
    pub is_empty: bool,
}

impl PoolSummary {
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        if candidates.is_empty() {
            return Self {
                count: 0,
                experience_range: None,
                common_skills: Vec::new(),
                is_empty: true,
            };
        }

        let (min, max) = candidates.iter().map(|c| c.profile.experience_years).fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), years| (min.min(years), max.max(years)),
        );

        Self {
            count: candidates.len(),
            experience_range: Some(format!("{}-{} years", min, max)),
            common_skills: most_common_skills(candidates, 10),
            is_empty: false,
        }
    }
}

/// A role's pool as loaded for one analysis run
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub candidates: Vec<Candidate>,
    pub formatted_text: String,
    pub summary: PoolSummary,
}

impl PoolSnapshot {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub struct PoolAssembler {
    store: Arc<dyn CandidateStore>,
    max_detailed: usize,
}

impl PoolAssembler {
    pub fn new(store: Arc<dyn CandidateStore>, config: &PoolConfig) -> Self {
        Self {
            store,
            max_detailed: config.max_detailed,
        }
    }

    /// Load and render the active pool for `role_id`. An unknown role yields an
    /// empty pool, not an error.
    pub async fn assemble(&self, role_id: &str) -> Result<PoolSnapshot, StoreError> {
        let candidates = self.store.list_active(role_id).await?;

        let formatted_text = render_pool_compressed(&candidates, self.max_detailed);
        let summary = PoolSummary::from_candidates(&candidates);

        info!(
            role_id = %role_id,
            candidates = candidates.len(),
            compressed = candidates.len() > self.max_detailed,
            "Pool assembled"
        );

        Ok(PoolSnapshot {
            candidates,
            formatted_text,
            summary,
        })
    }
}
