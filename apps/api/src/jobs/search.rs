//! Job search: fan out to the enabled sources, persist, filter, rank.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::scoring::relevance_score;
use crate::jobs::sources::SourceQuery;
use crate::models::job::{JobRow, NewJob, NewJobSearch};
use crate::models::MAX_PAGE_SIZE;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchRequest {
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

fn default_max_results() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedJob {
    #[serde(flatten)]
    pub job: JobRow,
    /// Keyword relevance to the query, 0–100.
    pub relevance: f64,
}

/// Every amount in a salary text, with `k` suffixes expanded
/// (`"€80,000 - €120,000"` → `[80000, 120000]`, `"60k-90k"` → `[60000, 90000]`).
///
/// `,` and `.` between digits group thousands, except a trailing group of one
/// or two digits, which is read as a decimal part (`"$120,000.00"`, `"1.5k"`).
/// Amounts are truncated to whole units.
fn salary_numbers(range: &str) -> Vec<i64> {
    let chars: Vec<char> = range.chars().collect();
    let mut numbers = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let mut groups = vec![String::new()];
        while i < chars.len() {
            let c = chars[i];
            if c.is_ascii_digit() {
                if let Some(group) = groups.last_mut() {
                    group.push(c);
                }
            } else if (c == ',' || c == '.')
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
            {
                groups.push(String::new());
            } else {
                break;
            }
            i += 1;
        }

        let fraction = match groups.last() {
            Some(last) if groups.len() > 1 && last.len() <= 2 => groups.pop(),
            _ => None,
        };
        let Ok(whole) = groups.concat().parse::<i64>() else {
            continue;
        };
        let cents = match fraction {
            Some(f) => format!("{f:0<2}").parse::<i64>().unwrap_or(0),
            None => 0,
        };
        let mut hundredths = whole.saturating_mul(100).saturating_add(cents);
        if matches!(chars.get(i), Some('k' | 'K')) {
            hundredths = hundredths.saturating_mul(1000);
        }
        numbers.push(hundredths / 100);
    }
    numbers
}

/// Upper end of a posting's advertised salary, if it has one.
pub fn salary_ceiling(range: Option<&str>) -> Option<i64> {
    range.and_then(|r| salary_numbers(r).into_iter().max())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Remote flag, experience level and job type (exact, case-insensitive),
/// location substring, and a minimum salary that the posting's range must
/// reach. Postings without a parsable salary fail a salary filter.
pub fn matches_filters(job: &JobRow, request: &JobSearchRequest) -> bool {
    if request.remote_only && !job.remote_option {
        return false;
    }
    if let Some(level) = request.experience_level.as_deref().filter(|l| !l.trim().is_empty()) {
        if !eq_ignore_case(&job.experience_level, level) {
            return false;
        }
    }
    if let Some(job_type) = request.job_type.as_deref().filter(|t| !t.trim().is_empty()) {
        if !eq_ignore_case(&job.job_type, job_type) {
            return false;
        }
    }
    if let Some(location) = request.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        if !job.location.to_lowercase().contains(&location.to_lowercase()) {
            return false;
        }
    }
    if let Some(min) = request.salary_min {
        match salary_ceiling(job.salary_range.as_deref()) {
            Some(ceiling) if ceiling >= min => {}
            _ => return false,
        }
    }
    true
}

/// Orders by stored match score, then relevance, then newest posting.
fn rank(jobs: &mut [RankedJob]) {
    jobs.sort_by(|a, b| {
        let score = |r: &RankedJob| r.job.match_score.unwrap_or(0.0);
        score(b)
            .total_cmp(&score(a))
            .then(b.relevance.total_cmp(&a.relevance))
            .then(b.job.posted_date.cmp(&a.job.posted_date))
    });
}

pub async fn search_jobs(
    state: &AppState,
    user_id: Uuid,
    request: JobSearchRequest,
) -> Result<Vec<RankedJob>, AppError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Search query must not be empty".to_string()));
    }
    let max_results = request.max_results.clamp(1, MAX_PAGE_SIZE) as usize;

    let source_query = SourceQuery {
        query,
        location: request.location.as_deref(),
        limit: MAX_PAGE_SIZE as usize,
    };

    let mut collected: Vec<NewJob> = Vec::new();
    let mut seen = HashSet::new();
    for source in state.sources.enabled() {
        match source.search(&source_query).await {
            Ok(jobs) => {
                info!("Source '{}' returned {} postings", source.id(), jobs.len());
                collected.extend(
                    jobs.into_iter()
                        .filter(|j| seen.insert(j.external_id.clone())),
                );
            }
            Err(e) => warn!("Job source '{}' failed, skipping: {e}", source.id()),
        }
    }

    let stored = state.store.upsert_jobs(collected).await?;

    let filters = serde_json::to_value(&request)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize search: {e}")))?;
    state
        .store
        .record_search(
            user_id,
            NewJobSearch {
                query: query.to_string(),
                location: request.location.clone(),
                filters,
                results_count: stored.len() as i32,
            },
        )
        .await?;

    let mut ranked: Vec<RankedJob> = stored
        .into_iter()
        .filter(|job| matches_filters(job, &request))
        .map(|job| {
            let relevance = relevance_score(&job, query);
            RankedJob { job, relevance }
        })
        .collect();
    rank(&mut ranked);
    ranked.truncate(max_results);

    info!("Search '{}' for user {} ranked {} jobs", query, user_id, ranked.len());
    Ok(ranked)
}
