// ============================================
// Tie-Breaker Resolver
// ============================================
//
// Flags adjacent ranks whose match scores are within the threshold and
// attaches a reason for the ordering. Closeness chains through the scan:
// if A-B and B-C are close, all three are flagged.

use crate::config::TieBreakerConfig;
use crate::models::{Dimension, PriorityMap, RankingRecord};
use crate::services::llm::ScoringCollaborator;
use crate::utils::fill_template;
use serde::Serialize;
use tracing::{debug, info, warn};

const GENERIC_REASON: &str = "Based on overall profile strength";

const TIE_BREAKER_PROMPT: &str = r#"Two candidates have similar scores. Explain why one ranks higher.

CANDIDATE A (Rank {rank_a}): {name_a}
Match Score: {score_a}%
Scores: {scores_a}

CANDIDATE B (Rank {rank_b}): {name_b}
Match Score: {score_b}%
Scores: {scores_b}

CRITICAL Dimensions: {critical_dims}

Explain in 2-3 sentences why Candidate A ranks higher, referencing:
- CRITICAL dimension performance
- Specific differentiating factors
- Concrete evidence from their profiles

Return ONLY valid JSON (no markdown):
{
  "tie_breaker_reason": "Your explanation"
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieBreakerEntry {
    pub candidate_id: String,
    pub rank: usize,
    pub match_score: u32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TieBreakerSummary {
    pub count: usize,
    pub affected_ranks: Vec<usize>,
    pub candidates: Vec<TieBreakerEntry>,
}

impl TieBreakerSummary {
    pub fn from_rankings(rankings: &[RankingRecord]) -> Self {
        let flagged: Vec<&RankingRecord> =
            rankings.iter().filter(|r| r.tie_breaker_applied).collect();

        Self {
            count: flagged.len(),
            affected_ranks: flagged.iter().map(|r| r.rank).collect(),
            candidates: flagged
                .iter()
                .map(|r| TieBreakerEntry {
                    candidate_id: r.candidate_id.clone(),
                    rank: r.rank,
                    match_score: r.match_score,
                    reason: r.tie_breaker_reason.clone(),
                })
                .collect(),
        }
    }
}

fn is_close(a: &RankingRecord, b: &RankingRecord, threshold: f64) -> bool {
    (a.match_score as f64 - b.match_score as f64).abs() <= threshold
}

/// One flag per record: true when it is close to either rank neighbour
pub fn detect_ties(rankings: &[RankingRecord], threshold: f64) -> Vec<bool> {
    let mut flags = vec![false; rankings.len()];

    for (i, pair) in rankings.windows(2).enumerate() {
        if is_close(&pair[0], &pair[1], threshold) {
            flags[i] = true;
            flags[i + 1] = true;
        }
    }

    flags
}

/// Reason for a flagged record when none was supplied: the CRITICAL dimension
/// where it scores highest (first in canonical order on equal scores).
pub fn default_reason(record: &RankingRecord, priorities: &PriorityMap) -> String {
    let best = priorities
        .critical_dimensions()
        .into_iter()
        .fold(None, |best: Option<(Dimension, u32)>, dimension| {
            let score = record.scores.get(dimension);
            match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((dimension, score)),
            }
        });

    match best {
        Some((dimension, score)) => format!(
            "Higher {} score ({}%) in CRITICAL dimension",
            dimension, score
        ),
        None => GENERIC_REASON.to_string(),
    }
}

/// Set `tie_breaker_applied` and fill missing reasons in place.
///
/// Returns, per record, whether its reason was generated here.
pub fn apply_tie_breaker_flags(
    rankings: &mut [RankingRecord],
    priorities: &PriorityMap,
    threshold: f64,
) -> Vec<bool> {
    let flags = detect_ties(rankings, threshold);
    let mut generated = vec![false; rankings.len()];

    for (i, record) in rankings.iter_mut().enumerate() {
        if flags[i] {
            record.tie_breaker_applied = true;
            if record.tie_breaker_reason.is_none() {
                record.tie_breaker_reason = Some(default_reason(record, priorities));
                generated[i] = true;
            }
        } else {
            record.tie_breaker_applied = false;
            record.tie_breaker_reason = None;
        }
    }

    generated
}

pub struct TieBreakerResolver {
    collaborator: Option<ScoringCollaborator>,
    threshold: f64,
    detailed_explanations: bool,
}

impl TieBreakerResolver {
    pub fn new(collaborator: Option<ScoringCollaborator>, config: &TieBreakerConfig) -> Self {
        Self {
            collaborator,
            threshold: config.threshold,
            detailed_explanations: config.detailed_explanations,
        }
    }

    /// Flag close ranks and attach reasons. With detailed explanations on,
    /// each close pair whose upper record carries a locally generated reason
    /// gets one collaborator call for a pair-specific explanation.
    pub async fn resolve(
        &self,
        rankings: &mut [RankingRecord],
        priorities: &PriorityMap,
    ) -> TieBreakerSummary {
        let generated = apply_tie_breaker_flags(rankings, priorities, self.threshold);

        if self.detailed_explanations {
            if let Some(collaborator) = &self.collaborator {
                for i in 0..rankings.len().saturating_sub(1) {
                    if !generated[i] || !is_close(&rankings[i], &rankings[i + 1], self.threshold) {
                        continue;
                    }

                    let explanation =
                        explain_pair(collaborator, &rankings[i], &rankings[i + 1], priorities)
                            .await;
                    if let Some(reason) = explanation {
                        rankings[i].tie_breaker_reason = Some(reason);
                    }
                }
            }
        }

        let summary = TieBreakerSummary::from_rankings(rankings);
        info!(
            flagged = summary.count,
            ranks = ?summary.affected_ranks,
            "Tie-breakers applied"
        );
        summary
    }
}

/// Pair-specific explanation; `None` on any failure
async fn explain_pair(
    collaborator: &ScoringCollaborator,
    higher: &RankingRecord,
    lower: &RankingRecord,
    priorities: &PriorityMap,
) -> Option<String> {
    let critical: Vec<&str> = priorities
        .critical_dimensions()
        .iter()
        .map(|d| d.as_str())
        .collect();

    let critical_dims = if critical.is_empty() {
        "None specified".to_string()
    } else {
        critical.join(", ")
    };
    let (rank_a, score_a) = (higher.rank.to_string(), higher.match_score.to_string());
    let (rank_b, score_b) = (lower.rank.to_string(), lower.match_score.to_string());
    let scores_a = serde_json::to_string(&higher.scores).unwrap_or_default();
    let scores_b = serde_json::to_string(&lower.scores).unwrap_or_default();

    let prompt = fill_template(
        TIE_BREAKER_PROMPT,
        &[
            ("rank_a", rank_a.as_str()),
            ("name_a", higher.name.as_str()),
            ("score_a", score_a.as_str()),
            ("scores_a", scores_a.as_str()),
            ("rank_b", rank_b.as_str()),
            ("name_b", lower.name.as_str()),
            ("score_b", score_b.as_str()),
            ("scores_b", scores_b.as_str()),
            ("critical_dims", critical_dims.as_str()),
        ],
    );

    match collaborator.score_json(&prompt).await {
        Ok(response) => {
            let reason = response
                .get("tie_breaker_reason")
                .and_then(|r| r.as_str())
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            if reason.is_none() {
                debug!(candidate_id = %higher.candidate_id, "No tie-breaker reason in response");
            }
            reason
        }
        Err(e) => {
            warn!(
                candidate_id = %higher.candidate_id,
                error = %e,
                "Tie-breaker explanation failed, keeping default reason"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Evaluation, PriorityLevel, ScoreMap};
    use crate::services::llm::test_support::{collaborator, ScriptedProvider};
    use crate::services::llm::LlmError;

    fn record(id: &str, rank: usize, match_score: u32) -> RankingRecord {
        RankingRecord {
            candidate_id: id.to_string(),
            name: format!("Name {}", id),
            rank,
            match_score,
            scores: ScoreMap::uniform(match_score),
            summary: vec![],
            why_selected: String::new(),
            compared_to_pool: String::new(),
            tie_breaker_applied: false,
            tie_breaker_reason: None,
            evaluation: Evaluation::Scored,
        }
    }

    fn ranked(scores: &[u32]) -> Vec<RankingRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| record(&format!("c{}", i), i + 1, *s))
            .collect()
    }

    fn detailed(provider: &std::sync::Arc<ScriptedProvider>) -> TieBreakerResolver {
        TieBreakerResolver::new(
            Some(collaborator(provider)),
            &TieBreakerConfig {
                detailed_explanations: true,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_close_pair_flags_only_its_members() {
        let mut rankings = ranked(&[90, 88, 70]);
        apply_tie_breaker_flags(&mut rankings, &PriorityMap::fallback(), 5.0);

        let flags: Vec<bool> = rankings.iter().map(|r| r.tie_breaker_applied).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(rankings[2].tie_breaker_reason, None);
        assert_eq!(rankings[0].tie_breaker_reason.as_deref(), Some(GENERIC_REASON));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert_eq!(detect_ties(&ranked(&[80, 75]), 5.0), vec![true, true]);
        assert_eq!(detect_ties(&ranked(&[80, 74]), 5.0), vec![false, false]);
        assert_eq!(detect_ties(&ranked(&[90, 83, 70]), 5.0), vec![false, false, false]);
    }

    #[test]
    fn test_closeness_chains() {
        // 80-76 and 76-72 are close, 80-72 is not
        assert_eq!(
            detect_ties(&ranked(&[80, 76, 72, 50]), 5.0),
            vec![true, true, true, false]
        );
        assert!(detect_ties(&[], 5.0).is_empty());
        assert_eq!(detect_ties(&ranked(&[60]), 5.0), vec![false]);
    }

    #[test]
    fn test_reason_uses_best_critical_dimension() {
        let priorities = PriorityMap::fallback()
            .with(Dimension::Skills, PriorityLevel::Critical)
            .with(Dimension::Projects, PriorityLevel::Critical);
        let mut r = record("a", 1, 80);
        r.scores = ScoreMap::uniform(70)
            .with(Dimension::Skills, 85)
            .with(Dimension::Projects, 92);

        assert_eq!(
            default_reason(&r, &priorities),
            "Higher projects score (92%) in CRITICAL dimension"
        );

        r.scores = ScoreMap::uniform(70)
            .with(Dimension::Skills, 88)
            .with(Dimension::Projects, 88);
        assert_eq!(
            default_reason(&r, &priorities),
            "Higher skills score (88%) in CRITICAL dimension"
        );
    }

    #[test]
    fn test_supplied_reason_is_kept_and_unflagged_reason_cleared() {
        let mut rankings = ranked(&[90, 89, 40]);
        rankings[0].tie_breaker_reason = Some("Led larger teams".to_string());
        rankings[2].tie_breaker_reason = Some("stale".to_string());

        let generated = apply_tie_breaker_flags(&mut rankings, &PriorityMap::fallback(), 5.0);

        assert_eq!(generated, vec![false, true, false]);
        assert_eq!(rankings[0].tie_breaker_reason.as_deref(), Some("Led larger teams"));
        assert!(!rankings[2].tie_breaker_applied);
        assert_eq!(rankings[2].tie_breaker_reason, None);
    }

    #[test]
    fn test_summary() {
        let mut rankings = ranked(&[90, 88, 70, 69]);
        apply_tie_breaker_flags(&mut rankings, &PriorityMap::fallback(), 5.0);
        let summary = TieBreakerSummary::from_rankings(&rankings);

        assert_eq!(summary.count, 4);
        assert_eq!(summary.affected_ranks, vec![1, 2, 3, 4]);
        assert_eq!(summary.candidates[1].match_score, 88);
    }

    #[tokio::test]
    async fn test_detailed_mode_replaces_generated_reasons() {
        let provider =
            ScriptedProvider::replying(r#"{"tie_breaker_reason": "Deeper Rust expertise"}"#);
        let mut rankings = ranked(&[90, 88, 86, 40]);
        rankings[1].tie_breaker_reason = Some("Collaborator reason".to_string());

        let summary = detailed(&provider)
            .resolve(&mut rankings, &PriorityMap::fallback())
            .await;

        // pair (1,2) skipped: rank 2 already had a supplied reason
        assert_eq!(provider.calls(), 1);
        assert_eq!(rankings[0].tie_breaker_reason.as_deref(), Some("Deeper Rust expertise"));
        assert_eq!(rankings[1].tie_breaker_reason.as_deref(), Some("Collaborator reason"));
        assert_eq!(rankings[2].tie_breaker_reason.as_deref(), Some(GENERIC_REASON));
        assert_eq!(summary.count, 3);
        assert!(provider.prompts()[0].contains("CANDIDATE A (Rank 1): Name c0"));
    }

    #[tokio::test]
    async fn test_detailed_mode_failure_keeps_default() {
        let provider = ScriptedProvider::failing(LlmError::Request("offline".into()));
        let mut rankings = ranked(&[90, 88]);

        detailed(&provider)
            .resolve(&mut rankings, &PriorityMap::fallback())
            .await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(rankings[0].tie_breaker_reason.as_deref(), Some(GENERIC_REASON));
    }

    #[tokio::test]
    async fn test_default_mode_makes_no_calls() {
        let provider = ScriptedProvider::replying("{}");
        let resolver = TieBreakerResolver::new(Some(collaborator(&provider)), &TieBreakerConfig::default());
        let mut rankings = ranked(&[90, 88]);

        resolver.resolve(&mut rankings, &PriorityMap::fallback()).await;
        assert_eq!(provider.calls(), 0);
    }
}
