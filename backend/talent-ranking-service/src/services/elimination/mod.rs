// ============================================
// Threshold Elimination
// ============================================
//
// One collaborator call scores the whole pool per dimension; candidates whose
// score falls below an enabled minimum are removed. The stage fails open: if
// scoring is unavailable nobody is eliminated.

use crate::models::{Candidate, Dimension, EliminationRecord, ScoreMap, StageStatus, ThresholdConfig};
use crate::services::llm::ScoringCollaborator;
use crate::services::pool::render_pool;
use crate::utils::fill_template;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

const SCORING_PROMPT: &str = r#"Score each candidate on the 5 dimensions (0-100).
Scores should be RELATIVE to the job requirements - 50 is meets basic requirements, 80+ is excellent match.

JOB DESCRIPTION:
{job_description}

CANDIDATES:
{candidates}

Return ONLY valid JSON (no markdown):
{
  "scores": {
    "candidate_id_1": {
      "experience": 75,
      "skills": 80,
      "projects": 65,
      "positions": 70,
      "education": 60
    },
    "candidate_id_2": { ... }
  }
}

Scoring Guidelines:
- experience: Based on years and relevance to the role
- skills: How well technical skills match JD requirements
- projects: Quality, complexity, and relevance of projects
- positions: Career progression and leadership roles
- education: Degree level and relevance to role

Use the actual candidate IDs from the input.
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliminatedCandidate {
    pub id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EliminationSummary {
    pub count: usize,
    /// Eliminations per failing dimension
    pub breakdown: BTreeMap<Dimension, usize>,
    pub candidates: Vec<EliminatedCandidate>,
}

impl EliminationSummary {
    pub fn from_records(eliminated: &[EliminationRecord]) -> Self {
        let mut breakdown = BTreeMap::new();
        for record in eliminated {
            *breakdown.entry(record.dimension).or_insert(0) += 1;
        }

        Self {
            count: eliminated.len(),
            breakdown,
            candidates: eliminated
                .iter()
                .map(|r| EliminatedCandidate {
                    id: r.candidate_id.clone(),
                    name: r.name.clone(),
                    reason: r.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EliminationOutcome {
    /// Survivors, in input order, with their threshold scores attached
    pub remaining: Vec<Candidate>,
    pub eliminated: Vec<EliminationRecord>,
    pub summary: EliminationSummary,
    pub status: StageStatus,
}

impl EliminationOutcome {
    fn pass_through(candidates: Vec<Candidate>, status: StageStatus) -> Self {
        Self {
            remaining: candidates,
            eliminated: Vec::new(),
            summary: EliminationSummary::default(),
            status,
        }
    }
}

/// Human-readable elimination reason
pub fn elimination_reason(dimension: Dimension, score: u32, minimum: f64) -> String {
    format!(
        "{} score {}% < minimum {}%",
        dimension.label(),
        score,
        minimum
    )
}

/// Split `candidates` by `thresholds`.
///
/// Enabled dimensions are checked in canonical order; the first one below its
/// minimum eliminates the candidate. Candidates absent from `scores` are kept
/// without scores.
pub fn apply_thresholds(
    candidates: Vec<Candidate>,
    thresholds: &ThresholdConfig,
    scores: &HashMap<String, ScoreMap>,
) -> (Vec<Candidate>, Vec<EliminationRecord>) {
    let mut remaining = Vec::with_capacity(candidates.len());
    let mut eliminated = Vec::new();

    for mut candidate in candidates {
        let Some(candidate_scores) = scores.get(&candidate.id) else {
            warn!(candidate_id = %candidate.id, "No threshold scores returned, keeping candidate");
            remaining.push(candidate);
            continue;
        };

        let failure = thresholds
            .enabled()
            .map(|(dimension, minimum)| (dimension, candidate_scores.get(dimension), minimum))
            .find(|(_, score, minimum)| (*score as f64) < *minimum);

        match failure {
            Some((dimension, score, minimum)) => eliminated.push(EliminationRecord {
                candidate_id: candidate.id.clone(),
                name: candidate.display_name().to_string(),
                dimension,
                reason: elimination_reason(dimension, score, minimum),
                scores: candidate_scores.clone(),
            }),
            None => {
                candidate.threshold_scores = Some(candidate_scores.clone());
                remaining.push(candidate);
            }
        }
    }

    info!(
        eliminated = eliminated.len(),
        remaining = remaining.len(),
        "Threshold elimination applied"
    );

    (remaining, eliminated)
}

pub struct ThresholdEliminator {
    collaborator: Option<ScoringCollaborator>,
}

impl ThresholdEliminator {
    pub fn new(collaborator: Option<ScoringCollaborator>) -> Self {
        Self { collaborator }
    }

    pub async fn eliminate(
        &self,
        job_description: &str,
        candidates: Vec<Candidate>,
        thresholds: &ThresholdConfig,
    ) -> EliminationOutcome {
        if !thresholds.has_enabled() {
            info!("No thresholds enabled, skipping elimination");
            return EliminationOutcome::pass_through(
                candidates,
                StageStatus::skipped("No thresholds enabled"),
            );
        }

        if candidates.is_empty() {
            info!("No candidates to process");
            return EliminationOutcome::pass_through(
                candidates,
                StageStatus::skipped("No candidates in pool"),
            );
        }

        info!(candidates = candidates.len(), "Scoring candidates for threshold check");

        let scores = match self.score_candidates(job_description, &candidates).await {
            Ok(scores) if !scores.is_empty() => scores,
            Ok(_) => {
                warn!("Scoring returned no candidates, skipping threshold elimination");
                return EliminationOutcome::pass_through(
                    candidates,
                    StageStatus::fallback("Failed to score candidates"),
                );
            }
            Err(error) => {
                warn!(error = %error, "Scoring failed, skipping threshold elimination");
                return EliminationOutcome::pass_through(
                    candidates,
                    StageStatus::fallback(error),
                );
            }
        };

        let (remaining, eliminated) = apply_thresholds(candidates, thresholds, &scores);
        let summary = EliminationSummary::from_records(&eliminated);

        EliminationOutcome {
            remaining,
            eliminated,
            summary,
            status: StageStatus::Completed,
        }
    }

    /// Per-dimension scores keyed by candidate id. Ids outside the pool are
    /// ignored.
    async fn score_candidates(
        &self,
        job_description: &str,
        candidates: &[Candidate],
    ) -> Result<HashMap<String, ScoreMap>, String> {
        let collaborator = self
            .collaborator
            .as_ref()
            .ok_or_else(|| "scoring collaborator not configured".to_string())?;

        let rendered = render_pool(candidates);
        let prompt = fill_template(
            SCORING_PROMPT,
            &[("job_description", job_description), ("candidates", rendered.as_str())],
        );

        let response = collaborator
            .score_json(&prompt)
            .await
            .map_err(|e| e.to_string())?;

        let Some(raw_scores) = response.get("scores").and_then(|s| s.as_object()) else {
            return Ok(HashMap::new());
        };

        let scores: HashMap<String, ScoreMap> = candidates
            .iter()
            .filter_map(|c| {
                raw_scores
                    .get(&c.id)
                    .map(|raw| (c.id.clone(), ScoreMap::from_response(Some(raw))))
            })
            .collect();

        info!(scored = scores.len(), "Threshold scores received");
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::test_support::{collaborator, ScriptedProvider};
    use crate::services::llm::LlmError;
    use serde_json::json;

    fn pool(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| {
                let mut c = Candidate::new(*id, "role-1");
                c.name = Some(format!("Name {}", id));
                c
            })
            .collect()
    }

    fn experience_minimum(minimum: f64) -> ThresholdConfig {
        ThresholdConfig::default().with_minimum(Dimension::Experience, minimum)
    }

    #[test]
    fn test_apply_thresholds_example() {
        let candidates = pool(&["a", "b", "c", "d"]);
        let scores: HashMap<String, ScoreMap> = [("a", 85), ("b", 65), ("c", 45), ("d", 30)]
            .iter()
            .map(|(id, s)| {
                (
                    id.to_string(),
                    ScoreMap::uniform(90).with(Dimension::Experience, *s),
                )
            })
            .collect();

        let (remaining, eliminated) = apply_thresholds(candidates, &experience_minimum(60.0), &scores);

        let kept: Vec<&str> = remaining.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(kept, vec!["a", "b"]);
        assert_eq!(eliminated.len(), 2);
        assert!(eliminated.iter().all(|e| e.reason.starts_with("Experience score")));
        assert_eq!(eliminated[0].reason, "Experience score 45% < minimum 60%");
        assert_eq!(
            remaining[1].threshold_scores.as_ref().map(|s| s.get(Dimension::Experience)),
            Some(65)
        );
    }

    #[test]
    fn test_first_failing_dimension_wins() {
        let thresholds = ThresholdConfig::default()
            .with_minimum(Dimension::Education, 80.0)
            .with_minimum(Dimension::Skills, 70.0);
        let scores: HashMap<String, ScoreMap> = [(
            "a".to_string(),
            ScoreMap::uniform(60),
        )]
        .into_iter()
        .collect();

        let (_, eliminated) = apply_thresholds(pool(&["a"]), &thresholds, &scores);

        assert_eq!(eliminated[0].dimension, Dimension::Skills);
        assert_eq!(eliminated[0].reason, "Skills score 60% < minimum 70%");
    }

    #[test]
    fn test_score_equal_to_minimum_passes() {
        let scores: HashMap<String, ScoreMap> =
            [("a".to_string(), ScoreMap::uniform(60))].into_iter().collect();
        let (remaining, eliminated) = apply_thresholds(pool(&["a"]), &experience_minimum(60.0), &scores);
        assert_eq!(remaining.len(), 1);
        assert!(eliminated.is_empty());
    }

    #[test]
    fn test_summary_breakdown() {
        let record = |id: &str, dimension| EliminationRecord {
            candidate_id: id.to_string(),
            name: id.to_string(),
            dimension,
            reason: String::new(),
            scores: ScoreMap::default(),
        };
        let summary = EliminationSummary::from_records(&[
            record("a", Dimension::Experience),
            record("b", Dimension::Skills),
            record("c", Dimension::Experience),
        ]);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.breakdown[&Dimension::Experience], 2);
        assert_eq!(summary.breakdown[&Dimension::Skills], 1);
        assert_eq!(
            serde_json::to_value(&summary).unwrap()["breakdown"],
            json!({"experience": 2, "skills": 1})
        );
    }

    #[tokio::test]
    async fn test_no_enabled_thresholds_skips_scoring() {
        let provider = ScriptedProvider::replying("{}");
        let eliminator = ThresholdEliminator::new(Some(collaborator(&provider)));

        let disabled = crate::models::DimensionThreshold {
            enabled: false,
            minimum: 60.0,
        };
        let thresholds =
            ThresholdConfig::validate(&[("experience".to_string(), disabled)].into_iter().collect())
                .unwrap();

        let outcome = eliminator
            .eliminate("jd", pool(&["a", "b", "c"]), &thresholds)
            .await;

        assert_eq!(outcome.remaining.len(), 3);
        assert_eq!(outcome.summary.count, 0);
        assert!(matches!(outcome.status, StageStatus::Skipped { .. }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_scoring_failure_fails_open() {
        let provider = ScriptedProvider::failing(LlmError::Request("connection reset".into()));
        let eliminator = ThresholdEliminator::new(Some(collaborator(&provider)));

        let outcome = eliminator
            .eliminate("jd", pool(&["a", "b"]), &experience_minimum(99.0))
            .await;

        assert_eq!(outcome.remaining.len(), 2);
        assert!(outcome.eliminated.is_empty());
        assert!(outcome.status.is_fallback());
    }

    #[tokio::test]
    async fn test_empty_score_set_fails_open() {
        let provider = ScriptedProvider::replying(r#"{"scores": {"stranger": {"experience": 10}}}"#);
        let eliminator = ThresholdEliminator::new(Some(collaborator(&provider)));

        let outcome = eliminator
            .eliminate("jd", pool(&["a"]), &experience_minimum(50.0))
            .await;

        assert_eq!(outcome.remaining.len(), 1);
        assert_eq!(outcome.status, StageStatus::fallback("Failed to score candidates"));
    }

    #[tokio::test]
    async fn test_eliminate_with_collaborator_scores() {
        let provider = ScriptedProvider::replying(
            &json!({
                "scores": {
                    "a": {"experience": 85, "skills": 70},
                    "b": {"experience": 65},
                    "c": {"experience": "45"},
                    "d": {"experience": 30}
                }
            })
            .to_string(),
        );
        let eliminator = ThresholdEliminator::new(Some(collaborator(&provider)));

        let outcome = eliminator
            .eliminate("jd", pool(&["a", "b", "c", "d", "e"]), &experience_minimum(60.0))
            .await;

        let kept: Vec<&str> = outcome.remaining.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(kept, vec!["a", "b", "e"]);
        assert_eq!(outcome.summary.count, 2);
        assert_eq!(outcome.summary.candidates[0].name, "Name c");
        assert_eq!(outcome.status, StageStatus::Completed);
        assert!(provider.prompts()[0].contains("Candidate 5 (ID: e)"));
        assert_eq!(
            outcome.remaining.len() + outcome.eliminated.len(),
            5
        );
    }
}
