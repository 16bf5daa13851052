//! Weighted Comparative Ranking
//!
//! Scores surviving candidates relative to each other and orders them by a
//! locally computed weighted match score.
//!
//! # Workflow
//! 1. Split the pool into contiguous batches of `batch_size`
//! 2. Score each batch with one collaborator call (bounded concurrency,
//!    rate-limit failures retried with exponential backoff)
//! 3. Validate every record and recompute its match score from the weights
//! 4. Concatenate batches in order, stable-sort, assign ranks `1..=N`
pub mod records;

pub use records::{
    default_record, fallback_records, fallback_summary, merge_and_rank, validate_rankings,
};

use crate::config::RankingConfig;
use crate::models::{Candidate, Dimension, PriorityMap, RankingRecord, StageStatus, WeightMap};
use crate::services::llm::{extract_json_payload, LlmError, ScoringCollaborator};
use crate::services::pool::render_pool;
use crate::utils::fill_template;
use futures::stream::{self, StreamExt};
use resilience::with_retry_if;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

const RANKING_PROMPT: &str = r#"You are an expert HR analyst. Rank candidates comparatively.

=== JOB DESCRIPTION ===
{job_description}

=== INFERRED PRIORITIES ===
{priorities}

=== SCORING WEIGHTS ===
{weights}

=== CANDIDATE POOL ({count} candidates) ===
{candidates}

=== THRESHOLD SCREENING SCORES ===
{screening}
These are absolute scores from the threshold check. Use them as evidence,
but score each dimension relative to this pool.

=== SCORING RULES ===
1. Score each dimension 0-100 RELATIVE to this pool:
   - 50 = average for this pool
   - 80+ = top 20% of pool
   - 90+ = exceptional, top 10%
   - Below 50 = below average for this pool
2. Consider quality over quantity
3. Look for concrete evidence, not just claims
4. CRITICAL dimensions should be scored strictly

=== TIE-BREAKER RULES ===
When candidates are within 5% match score, prefer in order: higher score in a
CRITICAL dimension, larger project impact, faster career progression,
leadership indicators, more recent experience. For such candidates set
"tie_breaker_reason" to a one-sentence explanation.

=== OUTPUT ===
Return ONLY valid JSON (no markdown):
{
  "rankings": [
    {
      "candidate_id": "uuid",
      "rank": 1,
      "match_score": 94,
      "scores": {
        "experience": 95,
        "skills": 92,
        "projects": 98,
        "positions": 90,
        "education": 85
      },
      "summary": [
        "First key strength (specific)",
        "Second key strength (specific)",
        "Third key strength (specific)"
      ],
      "why_selected": "2-3 sentence explanation of ranking",
      "compared_to_pool": "How they compare to other candidates",
      "tie_breaker_reason": null
    }
  ]
}

Rank ALL candidates. Order by match_score descending.
Use the actual candidate IDs from the input.
"#;

const NO_SCREENING: &str = "Not available";

/// Threshold-check scores already attached to the batch, one line per
/// candidate
pub fn screening_scores(batch: &[Candidate]) -> String {
    let lines: Vec<String> = batch
        .iter()
        .filter_map(|c| {
            let scores = c.threshold_scores.as_ref()?;
            let dims = Dimension::ALL
                .iter()
                .map(|d| format!("{} {}", d.as_str(), scores.get(*d)))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("- {}: {}", c.id, dims))
        })
        .collect();

    if lines.is_empty() {
        NO_SCREENING.to_string()
    } else {
        lines.join("\n")
    }
}

/// Outcome of scoring one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// 0-based position of the batch in the pool
    pub index: usize,
    pub size: usize,
    pub status: StageStatus,
}

#[derive(Debug, Clone)]
pub struct RankingOutcome {
    /// Final records, rank 1 first
    pub rankings: Vec<RankingRecord>,
    pub batches: Vec<BatchReport>,
    pub status: StageStatus,
}

struct BatchResult {
    index: usize,
    records: Vec<RankingRecord>,
    status: StageStatus,
}

/// Inputs shared by every batch prompt of one run
struct RankingContext<'a> {
    job_description: &'a str,
    weights: &'a WeightMap,
    priorities_text: String,
    weights_text: String,
}

pub struct RankingEngine {
    collaborator: Option<ScoringCollaborator>,
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(collaborator: Option<ScoringCollaborator>, config: RankingConfig) -> Self {
        Self {
            collaborator,
            config,
        }
    }

    pub async fn rank(
        &self,
        job_description: &str,
        candidates: &[Candidate],
        weights: &WeightMap,
        priorities: &PriorityMap,
    ) -> RankingOutcome {
        if candidates.is_empty() {
            info!("No candidates remaining, skipping ranking");
            return RankingOutcome {
                rankings: Vec::new(),
                batches: Vec::new(),
                status: StageStatus::skipped("No candidates remaining"),
            };
        }

        let context = RankingContext {
            job_description,
            weights,
            priorities_text: serde_json::to_string_pretty(priorities)
                .unwrap_or_else(|_| "{}".to_string()),
            weights_text: Dimension::ALL
                .iter()
                .map(|d| format!("{}: {}%", d.label(), weights.get(*d)))
                .collect::<Vec<_>>()
                .join("\n"),
        };

        let batch_size = self.config.batch_size.max(1);
        let batch_count = candidates.len().div_ceil(batch_size);

        info!(
            candidates = candidates.len(),
            batches = batch_count,
            batch_size,
            "Ranking candidates"
        );

        let mut results: Vec<BatchResult> = stream::iter(candidates.chunks(batch_size).enumerate())
            .map(|(index, batch)| self.rank_batch(index, batch, &context))
            .buffer_unordered(self.config.max_concurrent_batches.max(1))
            .collect()
            .await;

        // Completion order is arbitrary; concatenate in pool order
        results.sort_by_key(|r| r.index);

        let batches: Vec<BatchReport> = results
            .iter()
            .map(|r| BatchReport {
                index: r.index,
                size: r.records.len(),
                status: r.status.clone(),
            })
            .collect();

        let rankings = merge_and_rank(results.into_iter().flat_map(|r| r.records).collect());
        let status = overall_status(&batches);

        info!(ranked = rankings.len(), "Ranking completed");

        RankingOutcome {
            rankings,
            batches,
            status,
        }
    }

    async fn rank_batch(
        &self,
        index: usize,
        batch: &[Candidate],
        context: &RankingContext<'_>,
    ) -> BatchResult {
        let Some(collaborator) = &self.collaborator else {
            warn!(batch = index, "Scoring collaborator not configured, using fallback ranking");
            return BatchResult {
                index,
                records: fallback_records(batch, context.weights),
                status: StageStatus::fallback("scoring collaborator not configured"),
            };
        };

        info!(batch = index + 1, candidates = batch.len(), "Ranking batch");

        let count = batch.len().to_string();
        let candidates = render_pool(batch);
        let screening = screening_scores(batch);
        let prompt = fill_template(
            RANKING_PROMPT,
            &[
                ("job_description", context.job_description),
                ("priorities", context.priorities_text.as_str()),
                ("weights", context.weights_text.as_str()),
                ("count", count.as_str()),
                ("candidates", candidates.as_str()),
                ("screening", screening.as_str()),
            ],
        );

        let retry_config = self.config.retry_config();
        let response = with_retry_if(&retry_config, LlmError::is_rate_limited, || {
            collaborator.score(&prompt)
        })
        .await;

        match response {
            Ok(text) => {
                let (rankings, status) =
                    match serde_json::from_str::<Value>(extract_json_payload(&text)) {
                        Ok(data) => (data.get("rankings").cloned(), StageStatus::Completed),
                        Err(e) => {
                            warn!(batch = index, error = %e, "Malformed ranking response");
                            (None, StageStatus::fallback(format!("malformed response: {}", e)))
                        }
                    };

                let records = validate_rankings(rankings.as_ref(), batch, context.weights);
                BatchResult {
                    index,
                    records,
                    status,
                }
            }
            Err(e) => {
                error!(batch = index, error = %e, "Ranking failed, using fallback ranking");
                BatchResult {
                    index,
                    records: fallback_records(batch, context.weights),
                    status: StageStatus::fallback(e.into_inner().to_string()),
                }
            }
        }
    }
}

fn overall_status(batches: &[BatchReport]) -> StageStatus {
    let degraded: Vec<&BatchReport> = batches.iter().filter(|b| b.status.is_fallback()).collect();

    match degraded.first() {
        None => StageStatus::Completed,
        Some(first) if degraded.len() == batches.len() => first.status.clone(),
        Some(_) => StageStatus::fallback(format!(
            "{} of {} batches used fallback scoring",
            degraded.len(),
            batches.len()
        )),
    }
}
