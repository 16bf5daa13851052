use crate::models::{
    calculate_match_score, Candidate, Evaluation, RankingRecord, ScoreMap, WeightMap,
    DEFAULT_DIMENSION_SCORE,
};
use crate::utils::{clamp_score, coerce_score};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_SUMMARY: &str = "No summary available";
pub const DEFAULT_WHY_SELECTED: &str = "See scores for details";
pub const SYNTHESIZED_RATIONALE: &str = "Candidate could not be fully evaluated";
pub const FALLBACK_RATIONALE: &str = "Ranking unavailable due to error";
const SUMMARY_PLACEHOLDER: &str = "See full profile for details";
const MAX_SUMMARY_ITEMS: usize = 3;

/// Three summary bullets assembled from raw profile facts
pub fn fallback_summary(candidate: &Candidate) -> Vec<String> {
    let profile = &candidate.profile;
    let mut summary = Vec::with_capacity(MAX_SUMMARY_ITEMS);

    if profile.experience_years > 0.0 {
        summary.push(format!(
            "{} years of professional experience",
            profile.experience_years
        ));
    }

    if !profile.skills.is_empty() {
        let top_skills = profile
            .skills
            .iter()
            .take(4)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        summary.push(format!("Skilled in {}", top_skills));
    }

    if !profile.projects.is_empty() {
        summary.push(format!(
            "{} notable projects in portfolio",
            profile.projects.len()
        ));
    }

    if let Some(degree) = profile
        .education
        .first()
        .map(|e| e.degree())
        .filter(|d| !d.is_empty())
    {
        summary.push(format!("Education: {}", degree));
    }

    summary.truncate(MAX_SUMMARY_ITEMS);
    while summary.len() < MAX_SUMMARY_ITEMS {
        summary.push(SUMMARY_PLACEHOLDER.to_string());
    }

    summary
}

/// Record for a candidate the collaborator did not evaluate
pub fn default_record(
    candidate: &Candidate,
    weights: &WeightMap,
    rationale: &str,
    evaluation: Evaluation,
) -> RankingRecord {
    let scores = ScoreMap::uniform(DEFAULT_DIMENSION_SCORE);

    RankingRecord {
        candidate_id: candidate.id.clone(),
        name: candidate.display_name().to_string(),
        rank: 0,
        match_score: calculate_match_score(&scores, weights),
        scores,
        summary: fallback_summary(candidate),
        why_selected: rationale.to_string(),
        compared_to_pool: String::new(),
        tie_breaker_applied: false,
        tie_breaker_reason: None,
        evaluation,
    }
}

/// Records for a whole batch when the collaborator could not be used.
/// Ranks are provisional, in batch order.
pub fn fallback_records(batch: &[Candidate], weights: &WeightMap) -> Vec<RankingRecord> {
    batch
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let mut record =
                default_record(candidate, weights, FALLBACK_RATIONALE, Evaluation::Fallback);
            record.rank = i + 1;
            record
        })
        .collect()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn validate_summary(value: Option<&Value>) -> Vec<String> {
    let summary: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| non_empty_str(Some(item)))
                .take(MAX_SUMMARY_ITEMS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if summary.is_empty() {
        vec![DEFAULT_SUMMARY.to_string()]
    } else {
        summary
    }
}

/// Turn the collaborator's `rankings` array into one record per batch
/// candidate.
///
/// Entries for unknown or repeated ids are dropped. Batch candidates with no
/// entry are synthesized with uniform default scores. Every match score is
/// recomputed from `weights`.
pub fn validate_rankings(
    raw: Option<&Value>,
    batch: &[Candidate],
    weights: &WeightMap,
) -> Vec<RankingRecord> {
    let entries = raw.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    let mut seen: HashSet<&str> = HashSet::with_capacity(batch.len());
    let mut records = Vec::with_capacity(batch.len());

    for entry in entries {
        let Some(candidate_id) = entry.get("candidate_id").and_then(Value::as_str) else {
            warn!("Ranking entry without candidate_id, dropping");
            continue;
        };

        let Some(candidate) = batch.iter().find(|c| c.id == candidate_id) else {
            warn!(candidate_id = %candidate_id, "Unknown candidate_id in ranking, dropping");
            continue;
        };

        if !seen.insert(candidate.id.as_str()) {
            warn!(candidate_id = %candidate_id, "Duplicate ranking entry, dropping");
            continue;
        }

        let scores = ScoreMap::from_response(entry.get("scores"));
        let match_score = calculate_match_score(&scores, weights);

        let suggested = entry
            .get("match_score")
            .and_then(coerce_score)
            .map(clamp_score)
            .unwrap_or(DEFAULT_DIMENSION_SCORE);
        if suggested != match_score {
            debug!(
                candidate_id = %candidate_id,
                suggested,
                recomputed = match_score,
                "Discarding collaborator match score"
            );
        }

        records.push(RankingRecord {
            candidate_id: candidate.id.clone(),
            name: candidate.display_name().to_string(),
            rank: 0,
            match_score,
            scores,
            summary: validate_summary(entry.get("summary")),
            why_selected: non_empty_str(entry.get("why_selected"))
                .unwrap_or(DEFAULT_WHY_SELECTED)
                .to_string(),
            compared_to_pool: non_empty_str(entry.get("compared_to_pool"))
                .unwrap_or_default()
                .to_string(),
            tie_breaker_applied: false,
            tie_breaker_reason: non_empty_str(entry.get("tie_breaker_reason")).map(str::to_string),
            evaluation: Evaluation::Scored,
        });
    }

    for candidate in batch {
        if !seen.contains(candidate.id.as_str()) {
            warn!(candidate_id = %candidate.id, "Candidate missing from rankings, adding with default scores");
            records.push(default_record(
                candidate,
                weights,
                SYNTHESIZED_RATIONALE,
                Evaluation::Synthesized,
            ));
        }
    }

    records
}

/// Stable-sort by match score descending and assign ranks `1..=N`.
///
/// Equal scores keep their incoming order, so the result depends only on the
/// concatenation order of the input.
pub fn merge_and_rank(mut records: Vec<RankingRecord>) -> Vec<RankingRecord> {
    records.sort_by(|a, b| b.match_score.cmp(&a.match_score));

    for (i, record) in records.iter_mut().enumerate() {
        record.rank = i + 1;
    }

    records
}
