// ============================================
// Candidate Comparison
// ============================================
//
// Side-by-side explanation of why one ranked candidate outranks another.

use crate::models::{Dimension, PriorityMap, RankingRecord};
use crate::services::llm::ScoringCollaborator;
use crate::utils::fill_template;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

const COMPARISON_PROMPT: &str = r#"Compare these two candidates and explain why one ranks higher.

CANDIDATE A (Rank #{rank_a}):
Name: {name_a}
Match Score: {score_a}%
Dimension Scores:
{scores_a}

CANDIDATE B (Rank #{rank_b}):
Name: {name_b}
Match Score: {score_b}%
Dimension Scores:
{scores_b}

CRITICAL DIMENSIONS: {critical_dims}

Return ONLY valid JSON (no markdown):
{
  "explanation": "2-3 sentence explanation of why {winner} ranks higher than {loser}, referencing specific scores and CRITICAL dimensions",
  "key_differences": [
    "Experience: Specific comparison between candidates",
    "Skills: Specific comparison between candidates",
    "Any other notable difference"
  ]
}

Focus on:
1. CRITICAL dimension differences (these matter most)
2. Specific score gaps
3. What makes the winner stand out
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    #[serde(rename = "candidate_1")]
    First,
    #[serde(rename = "candidate_2")]
    Second,
    Tie,
}

impl Winner {
    fn of(a: u32, b: u32) -> Self {
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => Winner::First,
            std::cmp::Ordering::Less => Winner::Second,
            std::cmp::Ordering::Equal => Winner::Tie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonExplanation {
    pub overall_winner: Winner,
    pub dimension_winners: BTreeMap<Dimension, Winner>,
    pub explanation: String,
    pub key_differences: Vec<String>,
}

pub fn dimension_winners(a: &RankingRecord, b: &RankingRecord) -> BTreeMap<Dimension, Winner> {
    Dimension::ALL
        .iter()
        .map(|d| (*d, Winner::of(a.scores.get(*d), b.scores.get(*d))))
        .collect()
}

fn score_lines(record: &RankingRecord) -> String {
    Dimension::ALL
        .iter()
        .map(|d| format!("- {}: {}%", d.label(), record.scores.get(*d)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ComparisonExplainer {
    collaborator: Option<ScoringCollaborator>,
}

impl ComparisonExplainer {
    pub fn new(collaborator: Option<ScoringCollaborator>) -> Self {
        Self { collaborator }
    }

    /// Explain the ordering of `a` and `b`. The higher match score wins;
    /// `a` wins on equal scores.
    pub async fn explain(
        &self,
        a: &RankingRecord,
        b: &RankingRecord,
        priorities: &PriorityMap,
    ) -> ComparisonExplanation {
        let (winner, loser) = if a.match_score >= b.match_score {
            (a, b)
        } else {
            (b, a)
        };

        let fallback_explanation = format!(
            "{} ranks higher with a {}% score advantage. The weighted scoring considers dimension importance based on the job requirements.",
            winner.name,
            winner.match_score - loser.match_score
        );
        let fallback_differences = vec![format!(
            "Overall: {} {}% vs {} {}%",
            a.name, a.match_score, b.name, b.match_score
        )];

        let mut result = ComparisonExplanation {
            overall_winner: Winner::of(a.match_score, b.match_score),
            dimension_winners: dimension_winners(a, b),
            explanation: fallback_explanation,
            key_differences: fallback_differences,
        };

        let Some(collaborator) = &self.collaborator else {
            warn!("Scoring collaborator not configured, using fallback comparison");
            return result;
        };

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
        let (rank_a, score_a, scores_a) =
            (a.rank.to_string(), a.match_score.to_string(), score_lines(a));
        let (rank_b, score_b, scores_b) =
            (b.rank.to_string(), b.match_score.to_string(), score_lines(b));

        let prompt = fill_template(
            COMPARISON_PROMPT,
            &[
                ("rank_a", rank_a.as_str()),
                ("name_a", a.name.as_str()),
                ("score_a", score_a.as_str()),
                ("scores_a", scores_a.as_str()),
                ("rank_b", rank_b.as_str()),
                ("name_b", b.name.as_str()),
                ("score_b", score_b.as_str()),
                ("scores_b", scores_b.as_str()),
                ("critical_dims", critical_dims.as_str()),
                ("winner", winner.name.as_str()),
                ("loser", loser.name.as_str()),
            ],
        );

        match collaborator.score_json(&prompt).await {
            Ok(response) => {
                if let Some(explanation) = response
                    .get("explanation")
                    .and_then(Value::as_str)
                    .filter(|e| !e.trim().is_empty())
                {
                    result.explanation = explanation.to_string();
                }

                let differences: Vec<String> = response
                    .get("key_differences")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .filter(|d| !d.trim().is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                if !differences.is_empty() {
                    result.key_differences = differences;
                }

                info!(a = %a.candidate_id, b = %b.candidate_id, "Comparison explanation generated");
            }
            Err(e) => {
                warn!(error = %e, "Comparison explanation failed, using fallback");
            }
        }

        result
    }
}
