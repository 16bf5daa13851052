pub mod dimension;
pub mod weights;

pub use dimension::{Dimension, PriorityLevel, PriorityMap, ScoreMap, DEFAULT_DIMENSION_SCORE};
pub use weights::{
    calculate_match_score, ConfigurationError, DimensionThreshold, ThresholdConfig, WeightMap,
};

use crate::utils::coerce_score;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Active,
    Archived,
    Withdrawn,
}

/// A candidate in a role's pool. Profile fields are filled in by the upstream
/// extraction step; the ranking engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub role_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: CandidateStatus,
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: CandidateProfile,
    /// Per-dimension scores attached by threshold elimination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_scores: Option<ScoreMap>,
    /// Result of the most recent analysis run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingRecord>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role_id: role_id.into(),
            name: None,
            email: None,
            phone: None,
            status: CandidateStatus::Active,
            uploaded_at: Utc::now(),
            profile: CandidateProfile::default(),
            threshold_scores: None,
            ranking: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience_years: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience_details: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education: Vec<EducationEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<Project>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// Education is either a free-text line or a structured entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EducationEntry {
    Text(String),
    Detailed {
        #[serde(default)]
        degree: String,
        #[serde(default)]
        institution: String,
        #[serde(default, deserialize_with = "lenient_year")]
        year: Option<i32>,
    },
}

impl EducationEntry {
    pub fn degree(&self) -> &str {
        match self {
            EducationEntry::Text(text) => text,
            EducationEntry::Detailed { degree, .. } => degree,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(coerce_score)
        .and_then(|y| i32::try_from(y).ok()))
}

/// How a ranking record's scores were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// Scored by the collaborator
    #[default]
    Scored,
    /// Missing from the collaborator's response; uniform default scores
    Synthesized,
    /// Collaborator unavailable for the whole batch
    Fallback,
}

/// Final ranking of one surviving candidate for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub candidate_id: String,
    pub name: String,
    pub rank: usize,
    pub match_score: u32,
    pub scores: ScoreMap,
    pub summary: Vec<String>,
    pub why_selected: String,
    pub compared_to_pool: String,
    pub tie_breaker_applied: bool,
    pub tie_breaker_reason: Option<String>,
    pub evaluation: Evaluation,
}

/// A candidate removed by threshold elimination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationRecord {
    pub candidate_id: String,
    pub name: String,
    /// First enabled dimension that failed its minimum
    pub dimension: Dimension,
    pub reason: String,
    pub scores: ScoreMap,
}

/// Outcome tag carried by every stage result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Skipped { reason: String },
    Fallback { error: String },
}

impl StageStatus {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StageStatus::Skipped {
            reason: reason.into(),
        }
    }

    pub fn fallback(error: impl Into<String>) -> Self {
        StageStatus::Fallback {
            error: error.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageStatus::Fallback { .. })
    }
}
