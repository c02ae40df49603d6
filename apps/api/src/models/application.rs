use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::cv::CvRow;
use crate::models::job::JobRow;
use crate::models::Page;

/// Well-known status labels. Status itself is free-form; these only drive
/// timestamp stamping and analytics.
pub mod status {
    pub const DRAFT: &str = "draft";
    pub const PENDING: &str = "pending";
    pub const READY: &str = "ready";
    pub const APPLIED: &str = "applied";
    pub const RESPONDED: &str = "responded";
    pub const INTERVIEW_SCHEDULED: &str = "interview_scheduled";
    pub const OFFER: &str = "offer";

    pub const MAX_LEN: usize = 64;
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub cv_id: Uuid,
    pub status: String,
    pub cover_letter: Option<String>,
    pub adapted_cv_content: Option<Value>,
    pub notes: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
    pub response_date: Option<DateTime<Utc>>,
    pub interview_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub cv_id: Uuid,
    pub status: String,
    pub cover_letter: Option<String>,
    pub adapted_cv_content: Option<Value>,
    pub notes: Option<String>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationUpdate {
    pub status: Option<String>,
    pub cover_letter: Option<String>,
    pub notes: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
    pub response_date: Option<DateTime<Utc>>,
    pub interview_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ApplicationFilter {
    pub page: Page,
    pub status: Option<String>,
}

/// An application with its job and CV embedded, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub job: JobRow,
    pub cv: CvRow,
}
