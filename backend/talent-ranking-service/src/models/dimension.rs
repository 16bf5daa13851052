use crate::utils::{clamp_score, coerce_score};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Score assumed for a dimension the collaborator did not report
pub const DEFAULT_DIMENSION_SCORE: u32 = 50;

/// Evaluation axis. Declaration order is the canonical order used everywhere
/// a deterministic iteration is required (threshold checks, rounding fixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Experience,
    Skills,
    Projects,
    Positions,
    Education,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Experience,
        Dimension::Skills,
        Dimension::Projects,
        Dimension::Positions,
        Dimension::Education,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Experience => "experience",
            Dimension::Skills => "skills",
            Dimension::Projects => "projects",
            Dimension::Positions => "positions",
            Dimension::Education => "education",
        }
    }

    /// Capitalized form used in human-readable reasons
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Experience => "Experience",
            Dimension::Skills => "Skills",
            Dimension::Projects => "Projects",
            Dimension::Positions => "Positions",
            Dimension::Education => "Education",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "experience" => Some(Dimension::Experience),
            "skills" => Some(Dimension::Skills),
            "projects" => Some(Dimension::Projects),
            "positions" => Some(Dimension::Positions),
            "education" => Some(Dimension::Education),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance of a dimension for a particular job description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityLevel {
    Critical,
    Important,
    NiceToHave,
    LowPriority,
}

impl PriorityLevel {
    pub fn weight(&self) -> u8 {
        match self {
            PriorityLevel::Critical => 4,
            PriorityLevel::Important => 3,
            PriorityLevel::NiceToHave => 2,
            PriorityLevel::LowPriority => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Critical => "CRITICAL",
            PriorityLevel::Important => "IMPORTANT",
            PriorityLevel::NiceToHave => "NICE_TO_HAVE",
            PriorityLevel::LowPriority => "LOW_PRIORITY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(PriorityLevel::Critical),
            "IMPORTANT" => Some(PriorityLevel::Important),
            "NICE_TO_HAVE" => Some(PriorityLevel::NiceToHave),
            "LOW_PRIORITY" => Some(PriorityLevel::LowPriority),
            _ => None,
        }
    }
}

/// One priority level per dimension. Always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityMap(BTreeMap<Dimension, PriorityLevel>);

impl PriorityMap {
    /// Uniform map, mostly useful in tests
    pub fn uniform(level: PriorityLevel) -> Self {
        Self(Dimension::ALL.iter().map(|d| (*d, level)).collect())
    }

    /// Priorities applied when the job description cannot be analyzed
    pub fn fallback() -> Self {
        Self::uniform(PriorityLevel::Important).with(Dimension::Education, PriorityLevel::NiceToHave)
    }

    /// Build a complete map from the collaborator's `inferred_priorities` object.
    ///
    /// Missing dimensions and unrecognized levels become `IMPORTANT`.
    pub fn from_response(raw: Option<&Value>) -> Self {
        let object = raw.and_then(Value::as_object);

        let levels = Dimension::ALL
            .iter()
            .map(|dim| {
                let level = object
                    .and_then(|o| o.get(dim.as_str()))
                    .and_then(Value::as_str)
                    .and_then(PriorityLevel::parse)
                    .unwrap_or(PriorityLevel::Important);
                (*dim, level)
            })
            .collect();

        Self(levels)
    }

    pub fn with(mut self, dimension: Dimension, level: PriorityLevel) -> Self {
        self.0.insert(dimension, level);
        self
    }

    pub fn get(&self, dimension: Dimension) -> PriorityLevel {
        self.0
            .get(&dimension)
            .copied()
            .unwrap_or(PriorityLevel::Important)
    }

    /// CRITICAL dimensions in canonical order
    pub fn critical_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .filter(|d| self.get(*d) == PriorityLevel::Critical)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, PriorityLevel)> + '_ {
        self.0.iter().map(|(d, l)| (*d, *l))
    }
}

impl Default for PriorityMap {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Per-dimension integer scores in `[0, 100]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMap(BTreeMap<Dimension, u32>);

impl ScoreMap {
    pub fn uniform(score: u32) -> Self {
        Self(
            Dimension::ALL
                .iter()
                .map(|d| (*d, score.min(100)))
                .collect(),
        )
    }

    /// Normalize a raw score object from the collaborator: every dimension is
    /// present, missing or unreadable values default to 50, all are clamped.
    pub fn from_response(raw: Option<&Value>) -> Self {
        let object = raw.and_then(Value::as_object);

        Self(
            Dimension::ALL
                .iter()
                .map(|dim| {
                    let score = object
                        .and_then(|o| o.get(dim.as_str()))
                        .and_then(coerce_score)
                        .map(clamp_score)
                        .unwrap_or(DEFAULT_DIMENSION_SCORE);
                    (*dim, score)
                })
                .collect(),
        )
    }

    pub fn with(mut self, dimension: Dimension, score: u32) -> Self {
        self.0.insert(dimension, score.min(100));
        self
    }

    pub fn get(&self, dimension: Dimension) -> u32 {
        self.0
            .get(&dimension)
            .copied()
            .unwrap_or(DEFAULT_DIMENSION_SCORE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, u32)> + '_ {
        self.0.iter().map(|(d, s)| (*d, *s))
    }
}

impl Default for ScoreMap {
    fn default() -> Self {
        Self::uniform(DEFAULT_DIMENSION_SCORE)
    }
}

impl<const N: usize> From<[(Dimension, u32); N]> for ScoreMap {
    fn from(pairs: [(Dimension, u32); N]) -> Self {
        pairs
            .into_iter()
            .fold(ScoreMap::default(), |map, (d, s)| map.with(d, s))
    }
}
