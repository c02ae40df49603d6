//! Read-only views over a user's applications: analytics and job
//! recommendations. Both are keyword-based and make no LLM call.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::scoring::cv_match_score;
use crate::models::application::{status, ApplicationRow};
use crate::models::job::{JobFilter, JobRow};
use crate::models::{Page, MAX_PAGE_SIZE};
use crate::store::Store;

/// Jobs considered for recommendations, newest first.
const RECOMMENDATION_POOL: usize = 50;
/// Minimum keyword match score for a recommendation.
const RECOMMENDATION_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApplicationAnalytics {
    pub total_applications: usize,
    pub status_breakdown: BTreeMap<String, usize>,
    /// Responses (responded, interview, offer) per `applied`, in percent.
    pub response_rate: f64,
    pub average_match_score: f64,
    pub applications_this_month: usize,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn summarize(
    applications: &[ApplicationRow],
    job_scores: &HashMap<Uuid, f64>,
    now: DateTime<Utc>,
) -> ApplicationAnalytics {
    let mut status_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    for app in applications {
        *status_breakdown.entry(app.status.clone()).or_default() += 1;
    }

    let count = |label: &str| status_breakdown.get(label).copied().unwrap_or(0);
    let applied = count(status::APPLIED);
    let responded =
        count(status::RESPONDED) + count(status::INTERVIEW_SCHEDULED) + count(status::OFFER);
    let response_rate = if applied > 0 {
        round1(responded as f64 / applied as f64 * 100.0)
    } else {
        0.0
    };

    let scores: Vec<f64> = applications
        .iter()
        .filter_map(|a| job_scores.get(&a.job_id).copied())
        .filter(|s| *s > 0.0)
        .collect();
    let average_match_score = if scores.is_empty() {
        0.0
    } else {
        round1(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    let applications_this_month = applications
        .iter()
        .filter(|a| a.created_at.year() == now.year() && a.created_at.month() == now.month())
        .count();

    ApplicationAnalytics {
        total_applications: applications.len(),
        status_breakdown,
        response_rate,
        average_match_score,
        applications_this_month,
    }
}

pub async fn application_analytics(
    store: &dyn Store,
    user_id: Uuid,
) -> Result<ApplicationAnalytics, AppError> {
    let applications = store.all_applications(user_id).await?;

    let mut job_scores = HashMap::new();
    let job_ids: HashSet<Uuid> = applications.iter().map(|a| a.job_id).collect();
    for job_id in job_ids {
        if let Some(score) = store.get_job(job_id).await?.and_then(|j| j.match_score) {
            job_scores.insert(job_id, score);
        }
    }

    Ok(summarize(&applications, &job_scores, Utc::now()))
}

// ────────────────────────────────────────────────────────────────────────────
// Recommendations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub job: JobRow,
    pub recommended_cv_id: Uuid,
    pub cv_title: String,
    pub match_score: f64,
}

/// Newest jobs the user has not applied to yet.
async fn unapplied_jobs(
    store: &dyn Store,
    applied: &HashSet<Uuid>,
) -> Result<Vec<JobRow>, AppError> {
    let mut pool = Vec::new();
    let mut skip = 0;
    loop {
        let page = Page::new(Some(skip), Some(MAX_PAGE_SIZE), MAX_PAGE_SIZE);
        let batch = store
            .list_jobs(JobFilter {
                page,
                location: None,
                company: None,
            })
            .await?;
        let exhausted = (batch.len() as i64) < page.limit;
        pool.extend(batch.into_iter().filter(|j| !applied.contains(&j.id)));
        if pool.len() >= RECOMMENDATION_POOL || exhausted {
            break;
        }
        skip += page.limit;
    }
    pool.truncate(RECOMMENDATION_POOL);
    Ok(pool)
}

/// Every (base CV, unapplied job) pair scoring above the threshold, best first.
pub async fn recommend_jobs(
    store: &dyn Store,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<Recommendation>, AppError> {
    let base_cvs = store.list_base_cvs(user_id).await?;
    if base_cvs.is_empty() {
        return Ok(Vec::new());
    }

    let applied: HashSet<Uuid> = store
        .all_applications(user_id)
        .await?
        .into_iter()
        .map(|a| a.job_id)
        .collect();
    let jobs = unapplied_jobs(store, &applied).await?;

    let mut recommendations: Vec<Recommendation> = base_cvs
        .iter()
        .flat_map(|cv| {
            jobs.iter().filter_map(move |job| {
                let match_score = cv_match_score(job, cv);
                (match_score > RECOMMENDATION_THRESHOLD).then(|| Recommendation {
                    job: job.clone(),
                    recommended_cv_id: cv.id,
                    cv_title: cv.title.clone(),
                    match_score,
                })
            })
        })
        .collect();

    recommendations.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    recommendations.truncate(limit);
    Ok(recommendations)
}
