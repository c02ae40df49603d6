use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::cvs::adaptation::adapt_cv;
use crate::cvs::parser::{import_uploaded_pdf, initialize_from_sources};
use crate::errors::AppError;
use crate::models::cv::{CvCreate, CvRow, CvUpdate};
use crate::models::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default = "default_upload_title")]
    pub title: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_upload_title() -> String {
    "Uploaded CV".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AdaptRequest {
    pub job_id: Uuid,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("CV title must not be empty".to_string()));
    }
    Ok(())
}

/// GET /api/cvs
pub async fn handle_list_cvs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CvRow>>, AppError> {
    let page = Page::new(query.skip, query.limit, 100);
    Ok(Json(state.store.list_cvs(auth.user_id, page).await?))
}

/// GET /api/cvs/:id
pub async fn handle_get_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CvRow>, AppError> {
    state
        .store
        .get_cv(auth.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("CV {id} not found")))
}

/// POST /api/cvs
pub async fn handle_create_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CvCreate>,
) -> Result<(StatusCode, Json<CvRow>), AppError> {
    require_title(&body.title)?;
    let cv = state.store.create_cv(auth.user_id, body.into_new_cv()).await?;
    info!("Created CV {} for user {}", cv.id, auth.user_id);
    Ok((StatusCode::CREATED, Json(cv)))
}

/// POST /api/cvs/upload
/// Multipart body with a single `file` field holding a PDF.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CvRow>), AppError> {
    require_title(&query.title)?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;

    let cv = import_uploaded_pdf(
        &state,
        auth.user_id,
        &file_name,
        bytes,
        &query.title,
        &query.language,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(cv)))
}

/// PUT /api/cvs/:id
pub async fn handle_update_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CvUpdate>,
) -> Result<Json<CvRow>, AppError> {
    if let Some(title) = &body.title {
        require_title(title)?;
    }
    state
        .store
        .update_cv(auth.user_id, id, body)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("CV {id} not found")))
}

/// DELETE /api/cvs/:id
/// Rejected with 409 while an application references the CV.
pub async fn handle_delete_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_cv(auth.user_id, id).await? {
        return Err(AppError::NotFound(format!("CV {id} not found")));
    }
    info!("Deleted CV {} of user {}", id, auth.user_id);
    Ok(Json(json!({"message": "CV deleted successfully"})))
}

/// POST /api/cvs/:id/adapt
pub async fn handle_adapt_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AdaptRequest>,
) -> Result<(StatusCode, Json<CvRow>), AppError> {
    let cv = adapt_cv(
        state.store.as_ref(),
        state.llm.as_ref(),
        auth.user_id,
        id,
        body.job_id,
        &body.focus_areas,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(cv)))
}

/// POST /api/cvs/initialize-from-source
pub async fn handle_initialize_from_source(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let cvs = initialize_from_sources(&state, auth.user_id).await?;
    Ok(Json(json!({
        "message": format!("Initialized {} CV(s)", cvs.len()),
        "cvs": cvs,
    })))
}
