// ============================================
// Analysis Pipeline
// ============================================
//
// One analysis run for a role:
//   validate -> pool -> priorities -> elimination -> ranking -> tie-breakers
//   -> persist -> report
//
// Stages run strictly in sequence. Only configuration and store problems
// surface as errors; collaborator trouble degrades the affected stage.

use crate::config::Config;
use crate::models::{
    ConfigurationError, DimensionThreshold, PriorityMap, RankingRecord, StageStatus,
    ThresholdConfig, WeightMap,
};
use crate::services::comparison::{ComparisonExplainer, ComparisonExplanation};
use crate::services::elimination::{EliminationSummary, ThresholdEliminator};
use crate::services::llm::ScoringCollaborator;
use crate::services::pool::{CandidateStore, PoolAssembler, PoolSummary, StoreError};
use crate::services::priority::PriorityInference;
use crate::services::ranking::{BatchReport, RankingEngine};
use crate::services::tie_breaker::{TieBreakerResolver, TieBreakerSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

/// Number of candidates surfaced on the report's shortlist
pub const TOP_CANDIDATES: usize = 6;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("candidate {0} has no ranking")]
    NotRanked(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    pub role_id: String,
    pub job_description: String,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub thresholds: HashMap<String, DimensionThreshold>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EliminationReport {
    #[serde(flatten)]
    pub summary: EliminationSummary,
    pub status: StageStatus,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankingsSummary {
    pub total_ranked: usize,
    pub tie_breakers_applied: usize,
}

/// Shortlist entry: the ranking record plus contact details from the pool
#[derive(Debug, Clone, Serialize)]
pub struct TopCandidate {
    #[serde(flatten)]
    pub record: RankingRecord,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub role_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub pool: PoolSummary,
    pub weights: WeightMap,
    pub inferred_priorities: PriorityMap,
    pub priority_reasoning: String,
    pub priority_status: StageStatus,
    pub elimination: EliminationReport,
    pub ranking_status: StageStatus,
    pub batches: Vec<BatchReport>,
    pub rankings_summary: RankingsSummary,
    pub rankings: Vec<RankingRecord>,
    pub top_candidates: Vec<TopCandidate>,
    pub tie_breakers: TieBreakerSummary,
    pub why_not_others: String,
}

/// Plain-language account of the candidates outside the shortlist
pub fn why_not_others(rankings: &[RankingRecord], eliminated: usize, pool_size: usize) -> String {
    let split = rankings.len().min(TOP_CANDIDATES);
    let (top, below) = rankings.split_at(split);

    let mut parts = vec![format!("{} candidates in pool.", pool_size)];

    if eliminated > 0 {
        parts.push(format!("{} eliminated by thresholds.", eliminated));
    }

    if !below.is_empty() {
        parts.push(format!("{} candidates ranked below top {}.", below.len(), TOP_CANDIDATES));

        if below.len() > 3 {
            if let Some(top_min) = top.iter().map(|r| r.match_score).min() {
                let average = below.iter().map(|r| r.match_score as f64).sum::<f64>()
                    / below.len() as f64;
                let gap = top_min as f64 - average;
                if gap > 0.0 {
                    parts.push(format!("Average gap from top {}: {:.0}%.", TOP_CANDIDATES, gap));
                }
            }
        }
    }

    parts.join(" ")
}

pub struct AnalysisPipeline {
    store: Arc<dyn CandidateStore>,
    assembler: PoolAssembler,
    priorities: PriorityInference,
    eliminator: ThresholdEliminator,
    ranking: RankingEngine,
    tie_breaker: TieBreakerResolver,
    comparison: ComparisonExplainer,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        collaborator: Option<ScoringCollaborator>,
        config: &Config,
    ) -> Self {
        match &collaborator {
            Some(c) => info!(provider = c.provider_name(), "Analysis pipeline initialized"),
            None => info!("Analysis pipeline initialized without scoring collaborator"),
        }

        Self {
            assembler: PoolAssembler::new(store.clone(), &config.pool),
            priorities: PriorityInference::new(collaborator.clone(), &config.pool),
            eliminator: ThresholdEliminator::new(collaborator.clone()),
            ranking: RankingEngine::new(collaborator.clone(), config.ranking.clone()),
            tie_breaker: TieBreakerResolver::new(collaborator.clone(), &config.tie_breaker),
            comparison: ComparisonExplainer::new(collaborator),
            store,
        }
    }

    #[instrument(skip(self, request), fields(role_id = %request.role_id))]
    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisReport> {
        let started = Instant::now();

        let weights = WeightMap::validate(&request.weights)?;
        let thresholds = ThresholdConfig::validate(&request.thresholds)?;

        let pool = self.assembler.assemble(&request.role_id).await?;
        let pool_size = pool.len();
        let contacts: HashMap<String, Option<String>> = pool
            .candidates
            .iter()
            .map(|c| (c.id.clone(), c.email.clone()))
            .collect();

        let priority = self.priorities.infer(&request.job_description).await;

        let elimination = self
            .eliminator
            .eliminate(&request.job_description, pool.candidates, &thresholds)
            .await;

        let ranking = self
            .ranking
            .rank(
                &request.job_description,
                &elimination.remaining,
                &weights,
                &priority.priorities,
            )
            .await;

        let mut rankings = ranking.rankings;
        let tie_breakers = self
            .tie_breaker
            .resolve(&mut rankings, &priority.priorities)
            .await;

        self.store.save_ranking_results(&rankings).await?;

        let explanation = why_not_others(&rankings, elimination.eliminated.len(), pool_size);

        let top_candidates = rankings
            .iter()
            .take(TOP_CANDIDATES)
            .map(|record| TopCandidate {
                email: contacts.get(&record.candidate_id).cloned().flatten(),
                record: record.clone(),
            })
            .collect();

        info!(
            pool = pool_size,
            eliminated = elimination.eliminated.len(),
            ranked = rankings.len(),
            tie_breakers = tie_breakers.count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );

        Ok(AnalysisReport {
            run_id: Uuid::new_v4(),
            role_id: request.role_id,
            analyzed_at: Utc::now(),
            pool: pool.summary,
            weights,
            inferred_priorities: priority.priorities,
            priority_reasoning: priority.reasoning,
            priority_status: priority.status,
            elimination: EliminationReport {
                summary: elimination.summary,
                status: elimination.status,
            },
            ranking_status: ranking.status,
            batches: ranking.batches,
            rankings_summary: RankingsSummary {
                total_ranked: rankings.len(),
                tie_breakers_applied: tie_breakers.count,
            },
            rankings,
            top_candidates,
            tie_breakers,
            why_not_others: explanation,
        })
    }

    /// Compare two candidates using the rankings stored by the last run
    pub async fn compare(
        &self,
        first_id: &str,
        second_id: &str,
        priorities: &PriorityMap,
    ) -> Result<ComparisonExplanation> {
        let first = self.stored_ranking(first_id).await?;
        let second = self.stored_ranking(second_id).await?;

        Ok(self.comparison.explain(&first, &second, priorities).await)
    }

    async fn stored_ranking(&self, id: &str) -> Result<RankingRecord> {
        let candidate = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        candidate
            .ranking
            .ok_or_else(|| AnalysisError::NotRanked(id.to_string()))
    }
}
