use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Page;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: String,
    pub salary_range: Option<String>,
    pub job_type: String,
    pub remote_option: bool,
    pub posted_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub source: String,
    pub url: String,
    pub skills_required: Vec<String>,
    pub experience_level: String,
    /// Keyword match score (0–100) against the last CV it was scored for.
    pub match_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A job posting as produced by a source or submitted through `POST /api/jobs`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NewJob {
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub remote_option: bool,
    #[serde(default)]
    pub posted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub skills_required: Vec<String>,
    #[serde(default)]
    pub experience_level: String,
}

fn default_source() -> String {
    "manual".to_string()
}

/// Partial update body for `PUT /api/jobs/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub match_score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct JobFilter {
    pub page: Page,
    pub location: Option<String>,
    pub company: Option<String>,
}

/// One recorded search, kept as history per user.
#[derive(Debug, Clone)]
pub struct NewJobSearch {
    pub query: String,
    pub location: Option<String>,
    pub filters: Value,
    pub results_count: i32,
}
