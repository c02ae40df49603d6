//! Deterministic keyword scoring. No LLM call is involved.
//!
//! - `relevance_score`: how well a posting answers a search query.
//! - `cv_match_score`: how well a CV covers a posting (stored as `match_score`).
//!
//! Both return a value in `0.0..=100.0`.

use std::collections::HashSet;

use serde_json::Value;

use crate::jobs::sources::query_terms;
use crate::models::cv::CvRow;
use crate::models::job::JobRow;

const TITLE_WEIGHT: f64 = 3.0;
const SKILL_WEIGHT: f64 = 2.0;
const TEXT_WEIGHT: f64 = 1.0;

const SKILL_SHARE: f64 = 0.6;
const EXPERIENCE_SHARE: f64 = 0.4;

/// Word tokens (`\w+`), lowercased.
fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Each query term scores by where it is found: title (3), required skills
/// (2), description or requirements (1). The total is normalized against
/// every term hitting the title.
pub fn relevance_score(job: &JobRow, query: &str) -> f64 {
    let terms = query_terms(query);
    if terms.is_empty() {
        return 0.0;
    }

    let title = job.title.to_lowercase();
    let skills: Vec<String> = job.skills_required.iter().map(|s| s.to_lowercase()).collect();
    let text = format!("{} {}", job.description, job.requirements).to_lowercase();

    let earned: f64 = terms
        .iter()
        .map(|term| {
            if title.contains(term.as_str()) {
                TITLE_WEIGHT
            } else if skills.iter().any(|s| s.contains(term.as_str())) {
                SKILL_WEIGHT
            } else if text.contains(term.as_str()) {
                TEXT_WEIGHT
            } else {
                0.0
            }
        })
        .sum();

    let score = earned / (TITLE_WEIGHT * terms.len() as f64) * 100.0;
    (score * 10.0).round() / 10.0
}

fn experience_text(entry: &Value) -> String {
    let field = |key: &str| entry.get(key).and_then(Value::as_str).unwrap_or_default();
    format!("{} {}", field("position"), field("description"))
}

/// 60 % skill overlap (CV skills ∩ required skills, case-insensitive, over the
/// required skills) plus 40 % experience relevance (average share of the
/// job's title+description words found in each experience entry).
///
/// A job without required skills scores 0.
pub fn cv_match_score(job: &JobRow, cv: &CvRow) -> f64 {
    let job_skills: HashSet<String> = job.skills_required.iter().map(|s| s.to_lowercase()).collect();
    if job_skills.is_empty() {
        return 0.0;
    }
    let cv_skills: HashSet<String> = cv.skills.iter().map(|s| s.to_lowercase()).collect();
    let skill_score = job_skills.intersection(&cv_skills).count() as f64 / job_skills.len() as f64;

    let job_words = word_set(&format!("{} {}", job.title, job.description));
    let experience: Vec<Value> = cv.experience.as_array().cloned().unwrap_or_default();
    let experience_score = if experience.is_empty() || job_words.is_empty() {
        0.0
    } else {
        let total: f64 = experience
            .iter()
            .map(|entry| {
                let words = word_set(&experience_text(entry));
                job_words.intersection(&words).count() as f64 / job_words.len() as f64
            })
            .sum();
        total / experience.len() as f64
    };

    let score = (skill_score * SKILL_SHARE + experience_score * EXPERIENCE_SHARE) * 100.0;
    (score * 10.0).round() / 10.0
}
