use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::scoring::cv_match_score;
use crate::jobs::search::{search_jobs, JobSearchRequest, RankedJob};
use crate::models::job::{JobFilter, JobRow, JobUpdate, NewJob};
use crate::models::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub location: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub cv_id: Uuid,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Job {id} not found"))
}

/// POST /api/jobs/search
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JobSearchRequest>,
) -> Result<Json<Vec<RankedJob>>, AppError> {
    Ok(Json(search_jobs(&state, auth.user_id, body).await?))
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let filter = JobFilter {
        page: Page::new(query.skip, query.limit, 20),
        location: non_blank(query.location),
        company: non_blank(query.company),
    };
    Ok(Json(state.store.list_jobs(filter).await?))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    state.store.get_job(id).await?.map(Json).ok_or_else(|| not_found(id))
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<NewJob>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    if body.external_id.trim().is_empty() || body.title.trim().is_empty() {
        return Err(AppError::Validation(
            "external_id and title must not be empty".to_string(),
        ));
    }
    let job = state.store.create_job(body).await?;
    info!("Created job {} ({})", job.id, job.external_id);
    Ok((StatusCode::CREATED, Json(job)))
}

/// PUT /api/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<JobUpdate>,
) -> Result<Json<JobRow>, AppError> {
    if let Some(score) = body.match_score {
        if !(0.0..=100.0).contains(&score) {
            return Err(AppError::Validation(
                "match_score must be between 0 and 100".to_string(),
            ));
        }
    }
    state
        .store
        .update_job(id, body)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/jobs/:id
/// Rejected with 409 while an application references the job.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_job(id).await? {
        return Err(not_found(id));
    }
    info!("Deleted job {id}");
    Ok(Json(json!({"message": "Job deleted successfully"})))
}

/// POST /api/jobs/:id/match
/// Scores the caller's CV against the job and stores the result on the job.
pub async fn handle_match_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MatchRequest>,
) -> Result<Json<JobRow>, AppError> {
    let job = state.store.get_job(id).await?.ok_or_else(|| not_found(id))?;
    let cv = state
        .store
        .get_cv(auth.user_id, body.cv_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("CV {} not found", body.cv_id)))?;

    let score = cv_match_score(&job, &cv);
    info!("Job {} scored {:.1} against CV {}", job.id, score, cv.id);

    let update = JobUpdate {
        match_score: Some(score),
        ..JobUpdate::default()
    };
    state
        .store
        .update_job(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}
