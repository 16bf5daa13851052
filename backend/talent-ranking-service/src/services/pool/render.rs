use crate::models::Candidate;
use std::collections::HashMap;

const EMPTY_POOL: &str = "No candidates in pool.";
const NOT_SPECIFIED: &str = "Not specified";

/// Fixed-shape paragraph for one candidate. `index` is 1-based.
pub fn render_candidate(index: usize, candidate: &Candidate) -> String {
    let profile = &candidate.profile;

    let skills = if profile.skills.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        profile
            .skills
            .iter()
            .take(10)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let career_path = if profile.positions.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        profile
            .positions
            .iter()
            .take(4)
            .map(|p| p.title.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    };

    let education = profile
        .education
        .first()
        .map(|e| e.degree())
        .filter(|d| !d.is_empty())
        .unwrap_or(NOT_SPECIFIED);

    format!(
        "Candidate {index} (ID: {id}):\n  Name: {name}\n  Experience: {years} years\n  Skills: {skills}\n  Career Path: {career_path}\n  Projects: {projects} projects\n  Education: {education}",
        index = index,
        id = candidate.id,
        name = candidate.display_name(),
        years = profile.experience_years,
        skills = skills,
        career_path = career_path,
        projects = profile.projects.len(),
        education = education,
    )
}

/// Render every candidate in full detail
pub fn render_pool(candidates: &[Candidate]) -> String {
    if candidates.is_empty() {
        return EMPTY_POOL.to_string();
    }

    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| render_candidate(i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the first `max_detailed` candidates in full and fold the remainder
/// into one aggregate paragraph.
pub fn render_pool_compressed(candidates: &[Candidate], max_detailed: usize) -> String {
    if candidates.len() <= max_detailed {
        return render_pool(candidates);
    }

    let (detailed, remaining) = candidates.split_at(max_detailed);
    let average_experience = remaining
        .iter()
        .map(|c| c.profile.experience_years)
        .sum::<f64>()
        / remaining.len() as f64;

    let mut text = if detailed.is_empty() {
        String::new()
    } else {
        render_pool(detailed) + "\n\n"
    };

    text.push_str(&format!(
        "\n--- Remaining {} candidates (summarized) ---\nAverage experience: {:.1} years\nCommon skills: {}\nNote: These candidates have similar profiles to the detailed list above.",
        remaining.len(),
        average_experience,
        most_common_skills(remaining, 10).join(", "),
    ));

    text
}

/// Most frequent skills across `candidates`; ties keep first-seen order
pub fn most_common_skills(candidates: &[Candidate], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for skill in candidates.iter().flat_map(|c| c.profile.skills.iter()) {
        let next_index = counts.len();
        counts.entry(skill.as_str()).or_insert((0, next_index)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(skill, (count, first_seen))| (skill, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(skill, _, _)| skill.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EducationEntry, Position, Project};

    fn sample(id: &str) -> Candidate {
        let mut c = Candidate::new(id, "role-1");
        c.name = Some("Grace Hopper".to_string());
        c.profile.experience_years = 7.5;
        c.profile.skills = (1..=12).map(|i| format!("skill{}", i)).collect();
        c.profile.positions = ["Intern", "Engineer", "Senior", "Staff", "Principal"]
            .iter()
            .map(|t| Position {
                title: t.to_string(),
                year: None,
            })
            .collect();
        c.profile.projects = vec![Project::default(), Project::default()];
        c.profile.education = vec![EducationEntry::Detailed {
            degree: "BSc Mathematics".to_string(),
            institution: "Vassar".to_string(),
            year: Some(1928),
        }];
        c
    }

    #[test]
    fn test_render_candidate_shape() {
        let text = render_candidate(3, &sample("abc"));

        assert_eq!(
            text,
            "Candidate 3 (ID: abc):\n  Name: Grace Hopper\n  Experience: 7.5 years\n  Skills: skill1, skill2, skill3, skill4, skill5, skill6, skill7, skill8, skill9, skill10\n  Career Path: Intern → Engineer → Senior → Staff\n  Projects: 2 projects\n  Education: BSc Mathematics"
        );
    }

    #[test]
    fn test_render_sparse_candidate() {
        let mut c = Candidate::new("x", "role-1");
        c.profile.experience_years = 3.0;
        let text = render_candidate(1, &c);

        assert!(text.contains("Name: Unknown"));
        assert!(text.contains("Experience: 3 years"));
        assert!(text.contains("Skills: Not specified"));
        assert!(text.contains("Career Path: Not specified"));
        assert!(text.contains("Projects: 0 projects"));
        assert!(text.contains("Education: Not specified"));
    }

    #[test]
    fn test_empty_pool() {
        assert_eq!(render_pool(&[]), "No candidates in pool.");
        assert_eq!(render_pool_compressed(&[], 50), "No candidates in pool.");
    }

    #[test]
    fn test_compressed_rendering() {
        let pool: Vec<Candidate> = (0..5).map(|i| sample(&format!("c{}", i))).collect();

        assert_eq!(render_pool_compressed(&pool, 5), render_pool(&pool));

        let text = render_pool_compressed(&pool, 2);
        assert!(text.contains("Candidate 2 (ID: c1)"));
        assert!(!text.contains("Candidate 3 (ID: c2)"));
        assert!(text.contains("--- Remaining 3 candidates (summarized) ---"));
        assert!(text.contains("Average experience: 7.5 years"));
        assert!(text.contains("Common skills: skill1, skill2"));
    }

    #[test]
    fn test_most_common_skills() {
        let mut a = Candidate::new("a", "r");
        a.profile.skills = vec!["Go".into(), "Rust".into()];
        let mut b = Candidate::new("b", "r");
        b.profile.skills = vec!["Rust".into(), "SQL".into()];

        assert_eq!(
            most_common_skills(&[a, b], 10),
            vec!["Rust".to_string(), "Go".to_string(), "SQL".to_string()]
        );
    }
}
