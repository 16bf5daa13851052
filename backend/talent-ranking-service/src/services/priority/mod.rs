// ============================================
// Priority Inference
// ============================================
//
// Reads the job description once and classifies each dimension as CRITICAL,
// IMPORTANT, NICE_TO_HAVE or LOW_PRIORITY. Never fails: any problem yields the
// fallback map with the cause recorded in the stage status.

use crate::config::PoolConfig;
use crate::models::{PriorityMap, StageStatus};
use crate::services::llm::ScoringCollaborator;
use crate::utils::fill_template;
use serde::Serialize;
use tracing::{info, warn};

const FALLBACK_REASONING: &str = "Default priorities applied - could not analyze JD";

const PRIORITY_PROMPT: &str = r#"Analyze this job description and determine the importance of each dimension for candidate evaluation.

JOB DESCRIPTION:
{job_description}

For each dimension, assign ONE priority level:
- CRITICAL: The JD explicitly requires this, candidates MUST be strong here
- IMPORTANT: Valuable and mentioned, but not mandatory
- NICE_TO_HAVE: Would be a bonus, briefly mentioned or implied
- LOW_PRIORITY: Not mentioned in the JD at all

Return ONLY valid JSON (no markdown):
{
  "inferred_priorities": {
    "experience": "CRITICAL|IMPORTANT|NICE_TO_HAVE|LOW_PRIORITY",
    "skills": "CRITICAL|IMPORTANT|NICE_TO_HAVE|LOW_PRIORITY",
    "projects": "CRITICAL|IMPORTANT|NICE_TO_HAVE|LOW_PRIORITY",
    "positions": "CRITICAL|IMPORTANT|NICE_TO_HAVE|LOW_PRIORITY",
    "education": "CRITICAL|IMPORTANT|NICE_TO_HAVE|LOW_PRIORITY"
  },
  "reasoning": "2-3 sentence explanation of why you assigned these priorities based on the JD"
}

Examples of what to look for:
- "5+ years experience required" -> Experience = CRITICAL
- "React, Node.js, TypeScript" -> Skills = CRITICAL
- "Team lead experience preferred" -> Positions = IMPORTANT
- "Built scalable systems" -> Projects = IMPORTANT
- "CS degree preferred" -> Education = NICE_TO_HAVE
- No mention of education -> Education = LOW_PRIORITY
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityOutcome {
    pub priorities: PriorityMap,
    pub reasoning: String,
    pub status: StageStatus,
}

impl PriorityOutcome {
    fn fallback(error: impl Into<String>) -> Self {
        Self {
            priorities: PriorityMap::fallback(),
            reasoning: FALLBACK_REASONING.to_string(),
            status: StageStatus::fallback(error),
        }
    }
}

pub struct PriorityInference {
    collaborator: Option<ScoringCollaborator>,
    min_job_description_chars: usize,
}

impl PriorityInference {
    pub fn new(collaborator: Option<ScoringCollaborator>, config: &PoolConfig) -> Self {
        Self {
            collaborator,
            min_job_description_chars: config.min_job_description_chars,
        }
    }

    pub async fn infer(&self, job_description: &str) -> PriorityOutcome {
        if job_description.trim().chars().count() < self.min_job_description_chars {
            warn!("Job description too short, applying default priorities");
            return PriorityOutcome::fallback("Job description too short");
        }

        let Some(collaborator) = &self.collaborator else {
            warn!("Scoring collaborator not configured, applying default priorities");
            return PriorityOutcome::fallback("scoring collaborator not configured");
        };

        let prompt = fill_template(PRIORITY_PROMPT, &[("job_description", job_description)]);

        match collaborator.score_json(&prompt).await {
            Ok(response) if !response.is_object() => {
                warn!("Priority response is not a JSON object, applying default priorities");
                PriorityOutcome::fallback("malformed response: expected JSON object")
            }
            Ok(response) => {
                let priorities = PriorityMap::from_response(response.get("inferred_priorities"));
                let reasoning = response
                    .get("reasoning")
                    .and_then(|r| r.as_str())
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or("Analysis completed")
                    .to_string();

                info!(
                    critical = ?priorities.critical_dimensions(),
                    "Priority inference completed"
                );

                PriorityOutcome {
                    priorities,
                    reasoning,
                    status: StageStatus::Completed,
                }
            }
            Err(e) => {
                warn!(error = %e, "Priority inference failed, applying default priorities");
                PriorityOutcome::fallback(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimension, PriorityLevel};
    use crate::services::llm::test_support::{collaborator, ScriptedProvider};
    use crate::services::llm::LlmError;

    const JD: &str = "Senior backend engineer. 5+ years of Rust or Go required, \
                      distributed systems experience, team lead experience preferred.";

    fn inference(provider: Option<&std::sync::Arc<ScriptedProvider>>) -> PriorityInference {
        PriorityInference::new(provider.map(collaborator), &PoolConfig::default())
    }

    #[tokio::test]
    async fn test_short_job_description_uses_defaults() {
        let provider = ScriptedProvider::replying("{}");
        let outcome = inference(Some(&provider)).infer("Rust dev").await;

        assert_eq!(outcome.priorities, PriorityMap::fallback());
        assert_eq!(outcome.reasoning, FALLBACK_REASONING);
        assert_eq!(outcome.status, StageStatus::fallback("Job description too short"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_collaborator_uses_defaults() {
        let outcome = inference(None).infer(JD).await;
        assert!(outcome.status.is_fallback());
        assert_eq!(
            outcome.priorities.get(Dimension::Education),
            PriorityLevel::NiceToHave
        );
    }

    #[tokio::test]
    async fn test_response_is_validated() {
        let provider = ScriptedProvider::replying(
            r#"```json
            {
              "inferred_priorities": {
                "experience": "CRITICAL",
                "skills": "critical",
                "projects": "MUST_HAVE",
                "education": "LOW_PRIORITY"
              },
              "reasoning": "Experience and skills are explicitly required."
            }
            ```"#,
        );

        let outcome = inference(Some(&provider)).infer(JD).await;

        assert_eq!(outcome.status, StageStatus::Completed);
        assert_eq!(
            outcome.priorities.critical_dimensions(),
            vec![Dimension::Experience, Dimension::Skills]
        );
        assert_eq!(
            outcome.priorities.get(Dimension::Projects),
            PriorityLevel::Important
        );
        assert_eq!(
            outcome.priorities.get(Dimension::Positions),
            PriorityLevel::Important
        );
        assert_eq!(outcome.reasoning, "Experience and skills are explicitly required.");
        assert!(provider.prompts()[0].contains("5+ years of Rust"));
    }

    #[tokio::test]
    async fn test_missing_reasoning_defaults() {
        let provider = ScriptedProvider::replying(r#"{"inferred_priorities": {}}"#);
        let outcome = inference(Some(&provider)).infer(JD).await;

        assert_eq!(outcome.reasoning, "Analysis completed");
        assert_eq!(
            outcome.priorities,
            PriorityMap::uniform(PriorityLevel::Important)
        );
    }

    #[tokio::test]
    async fn test_collaborator_failure_falls_back() {
        let provider = ScriptedProvider::failing(LlmError::Api {
            status: 500,
            message: "backend unavailable".to_string(),
        });

        let outcome = inference(Some(&provider)).infer(JD).await;

        assert_eq!(outcome.priorities, PriorityMap::fallback());
        match outcome.status {
            StageStatus::Fallback { error } => assert!(error.contains("backend unavailable")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let provider = ScriptedProvider::replying("not json at all");
        let outcome = inference(Some(&provider)).infer(JD).await;
        assert!(outcome.status.is_fallback());
        assert_eq!(outcome.priorities, PriorityMap::fallback());
    }

    #[tokio::test]
    async fn test_non_object_response_falls_back() {
        for body in [r#"["CRITICAL"]"#, r#""ok""#, "42"] {
            let provider = ScriptedProvider::replying(body);
            let outcome = inference(Some(&provider)).infer(JD).await;

            assert_eq!(
                outcome.status,
                StageStatus::fallback("malformed response: expected JSON object"),
                "body {}",
                body
            );
            assert_eq!(outcome.priorities, PriorityMap::fallback());
            assert_eq!(outcome.reasoning, FALLBACK_REASONING);
        }
    }
}
