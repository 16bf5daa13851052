//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use talent_ranking_service::services::llm::Result as LlmResult;
use talent_ranking_service::{Candidate, InMemoryCandidateStore, LlmProvider, ScoringCollaborator};

pub const ROLE_ID: &str = "role-backend";

pub const JOB_DESCRIPTION: &str = "Senior backend engineer. 5+ years building distributed \
    systems in Rust or Go is required. Experience leading a small team is preferred.";

/// Which stage a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Priority,
    Threshold,
    Ranking,
    TieBreaker,
    Comparison,
}

pub fn stage_of(prompt: &str) -> Stage {
    if prompt.contains("\"inferred_priorities\"") {
        Stage::Priority
    } else if prompt.starts_with("Score each candidate") {
        Stage::Threshold
    } else if prompt.starts_with("Two candidates have similar scores") {
        Stage::TieBreaker
    } else if prompt.starts_with("Compare these two candidates") {
        Stage::Comparison
    } else {
        Stage::Ranking
    }
}

/// Candidate ids in the order they appear in a rendered pool
pub fn ids_in(prompt: &str) -> Vec<String> {
    prompt
        .split("(ID: ")
        .skip(1)
        .filter_map(|rest| rest.split(')').next())
        .map(str::to_string)
        .collect()
}

/// Trailing number of an id like `c07`
pub fn number_of(id: &str) -> u32 {
    id.trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0)
}

/// Ranking response scoring every dimension of `cNN` as `score(NN)`
pub fn rankings_response(prompt: &str, score: impl Fn(u32) -> u32) -> Value {
    let rankings: Vec<Value> = ids_in(prompt)
        .iter()
        .map(|id| {
            let s = score(number_of(id));
            json!({
                "candidate_id": id,
                "match_score": s,
                "scores": {
                    "experience": s,
                    "skills": s,
                    "projects": s,
                    "positions": s,
                    "education": s
                },
                "summary": [format!("Summary for {}", id)],
                "why_selected": "Solid match",
                "compared_to_pool": "Around the pool average"
            })
        })
        .collect();

    json!({ "rankings": rankings })
}

/// Threshold response giving `cNN` an experience score of `score(NN)`
pub fn threshold_response(prompt: &str, score: impl Fn(u32) -> u32) -> Value {
    let scores: serde_json::Map<String, Value> = ids_in(prompt)
        .iter()
        .map(|id| (id.clone(), json!({ "experience": score(number_of(id)) })))
        .collect();

    json!({ "scores": scores })
}

type Responder = Box<dyn Fn(Stage, &str) -> LlmResult<String> + Send + Sync>;

/// Provider answering each prompt through a closure, recording every call
pub struct ScriptedProvider {
    responder: Responder,
    calls: AtomicUsize,
    stages: Mutex<Vec<Stage>>,
}

impl ScriptedProvider {
    pub fn new(
        responder: impl Fn(Stage, &str) -> LlmResult<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            stages: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, stage: Stage) -> usize {
        self.stages
            .lock()
            .map(|s| s.iter().filter(|s| **s == stage).count())
            .unwrap_or(0)
    }

    pub fn collaborator(self: &Arc<Self>) -> ScoringCollaborator {
        ScoringCollaborator::new(self.clone())
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stage = stage_of(prompt);
        if let Ok(mut stages) = self.stages.lock() {
            stages.push(stage);
        }
        (self.responder)(stage, prompt)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn candidate(n: usize) -> Candidate {
    let mut c = Candidate::new(format!("c{:02}", n), ROLE_ID);
    c.name = Some(format!("Candidate {}", n));
    c.email = Some(format!("candidate{}@example.com", n));
    c.profile.experience_years = (n % 12) as f64;
    c.profile.skills = vec!["Rust".to_string(), "Go".to_string(), "Kafka".to_string()];
    c
}

pub fn store_with(n: usize) -> Arc<InMemoryCandidateStore> {
    Arc::new(InMemoryCandidateStore::with_candidates((0..n).map(candidate)))
}
