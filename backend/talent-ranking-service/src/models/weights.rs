use super::dimension::{Dimension, ScoreMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Weight given to a dimension the caller left out
pub const DEFAULT_DIMENSION_WEIGHT: f64 = 20.0;

/// Rejected weight or threshold input. Raised before any collaborator call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("weight for {dimension} must be a finite non-negative number, got {value}")]
    InvalidWeight { dimension: Dimension, value: f64 },

    #[error("at least one dimension weight must be positive")]
    ZeroWeights,

    #[error("dimension weights must have a finite total")]
    InvalidTotal,

    #[error("threshold minimum for {dimension} must be within 0-100, got {value}")]
    InvalidThreshold { dimension: Dimension, value: f64 },
}

/// Integer weight per dimension, summing to exactly 100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap(BTreeMap<Dimension, u32>);

impl Default for WeightMap {
    fn default() -> Self {
        Self(Dimension::ALL.iter().map(|d| (*d, 20)).collect())
    }
}

impl WeightMap {
    /// Validate and normalize raw weights.
    ///
    /// Missing dimensions default to 20. When the total is not 100 every
    /// weight is scaled by `100 / total` and rounded half-to-even; the
    /// rounding residue is added to `experience`.
    pub fn validate(raw: &HashMap<String, f64>) -> Result<Self, ConfigurationError> {
        let mut values: BTreeMap<Dimension, f64> = Dimension::ALL
            .iter()
            .map(|d| (*d, DEFAULT_DIMENSION_WEIGHT))
            .collect();

        for (key, value) in raw {
            let dimension = Dimension::parse(key)
                .ok_or_else(|| ConfigurationError::UnknownDimension(key.clone()))?;
            if !value.is_finite() || *value < 0.0 {
                return Err(ConfigurationError::InvalidWeight {
                    dimension,
                    value: *value,
                });
            }
            values.insert(dimension, *value);
        }

        let total: f64 = values.values().sum();
        if !total.is_finite() {
            return Err(ConfigurationError::InvalidTotal);
        }
        if total <= 0.0 {
            return Err(ConfigurationError::ZeroWeights);
        }

        let factor = if (total - 100.0).abs() < 1e-9 {
            1.0
        } else {
            100.0 / total
        };

        let mut rounded: BTreeMap<Dimension, i64> = values
            .iter()
            .map(|(d, v)| (*d, (v * factor).round_ties_even() as i64))
            .collect();

        let residue = 100 - rounded.values().sum::<i64>();
        if residue != 0 {
            let experience = rounded.entry(Dimension::Experience).or_insert(0);
            *experience += residue;

            // Only reachable when experience rounds to 0 and the others round up
            if *experience < 0 {
                let deficit = -*experience;
                *experience = 0;
                if let Some(largest) = Dimension::ALL
                    .iter()
                    .copied()
                    .fold(None, |best: Option<Dimension>, d| match best {
                        Some(b) if rounded[&b] >= rounded[&d] => Some(b),
                        _ => Some(d),
                    })
                {
                    *rounded.entry(largest).or_insert(0) -= deficit;
                }
            }
        }

        Ok(Self(
            rounded
                .into_iter()
                .map(|(d, w)| (d, w.max(0) as u32))
                .collect(),
        ))
    }

    pub fn get(&self, dimension: Dimension) -> u32 {
        self.0.get(&dimension).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, u32)> + '_ {
        self.0.iter().map(|(d, w)| (*d, *w))
    }
}

/// Weighted match score: `round(Σ score·weight / Σ weight)`, half-to-even.
///
/// The single source of truth for ordering; the collaborator's own match score
/// is never used.
pub fn calculate_match_score(scores: &ScoreMap, weights: &WeightMap) -> u32 {
    let (total, weight_sum) = Dimension::ALL.iter().fold((0u64, 0u64), |(t, w), dim| {
        let weight = weights.get(*dim) as u64;
        (t + scores.get(*dim) as u64 * weight, w + weight)
    });

    if weight_sum == 0 {
        return 0;
    }

    (total as f64 / weight_sum as f64).round_ties_even() as u32
}

/// Minimum passing score for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionThreshold {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub minimum: f64,
}

/// Per-dimension elimination thresholds. Absent or disabled dimensions impose
/// no constraint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdConfig(BTreeMap<Dimension, DimensionThreshold>);

impl ThresholdConfig {
    pub fn validate(raw: &HashMap<String, DimensionThreshold>) -> Result<Self, ConfigurationError> {
        let mut thresholds = BTreeMap::new();

        for (key, threshold) in raw {
            let dimension = Dimension::parse(key)
                .ok_or_else(|| ConfigurationError::UnknownDimension(key.clone()))?;
            if !threshold.minimum.is_finite() || !(0.0..=100.0).contains(&threshold.minimum) {
                return Err(ConfigurationError::InvalidThreshold {
                    dimension,
                    value: threshold.minimum,
                });
            }
            thresholds.insert(dimension, *threshold);
        }

        Ok(Self(thresholds))
    }

    /// Enable a minimum for `dimension`
    pub fn with_minimum(mut self, dimension: Dimension, minimum: f64) -> Self {
        self.0.insert(
            dimension,
            DimensionThreshold {
                enabled: true,
                minimum,
            },
        );
        self
    }

    /// Enabled `(dimension, minimum)` pairs in canonical dimension order
    pub fn enabled(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        self.0
            .iter()
            .filter(|(_, t)| t.enabled)
            .map(|(d, t)| (*d, t.minimum))
    }

    pub fn has_enabled(&self) -> bool {
        self.enabled().next().is_some()
    }
}
