use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::applications::analysis::{analyze_fit, ApplicationAnalysis};
use crate::applications::analytics::{
    application_analytics, recommend_jobs, ApplicationAnalytics, Recommendation,
};
use crate::applications::cover_letter::{generate_cover_letter, CoverLetterOptions};
use crate::applications::status::{normalize_status, status_change};
use crate::applications::workflow::{run_batch, BatchReport, BatchRequest};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::application::{
    status, ApplicationDetail, ApplicationFilter, ApplicationRow, ApplicationUpdate,
    NewApplication,
};
use crate::models::cv::CvRow;
use crate::models::job::JobRow;
use crate::models::Page;
use crate::state::AppState;
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationCreate {
    pub job_id: Uuid,
    pub cv_id: Uuid,
    #[serde(default = "default_status")]
    pub status: String,
    pub cover_letter: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub generate_cover_letter: bool,
}

fn default_status() -> String {
    status::PENDING.to_string()
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default = "default_recommendation_limit")]
    pub limit: usize,
}

fn default_recommendation_limit() -> usize {
    5
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Application {id} not found"))
}

async fn find_application(
    store: &dyn Store,
    user_id: Uuid,
    id: Uuid,
) -> Result<ApplicationRow, AppError> {
    store
        .get_application(user_id, id)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn job_and_cv(
    store: &dyn Store,
    user_id: Uuid,
    job_id: Uuid,
    cv_id: Uuid,
) -> Result<(JobRow, CvRow), AppError> {
    let job = store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    let cv = store
        .get_cv(user_id, cv_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("CV {cv_id} not found")))?;
    Ok((job, cv))
}

async fn with_details(
    store: &dyn Store,
    application: ApplicationRow,
) -> Result<ApplicationDetail, AppError> {
    let (job, cv) = job_and_cv(
        store,
        application.user_id,
        application.job_id,
        application.cv_id,
    )
    .await?;
    Ok(ApplicationDetail {
        application,
        job,
        cv,
    })
}

/// GET /api/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<Vec<ApplicationDetail>>, AppError> {
    let filter = ApplicationFilter {
        page: Page::new(query.skip, query.limit, 100),
        status: query
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    };
    let store = state.store.as_ref();
    let rows = store.list_applications(auth.user_id, filter).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in rows {
        details.push(with_details(store, row).await?);
    }
    Ok(Json(details))
}

/// GET /api/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationDetail>, AppError> {
    let store = state.store.as_ref();
    let row = find_application(store, auth.user_id, id).await?;
    Ok(Json(with_details(store, row).await?))
}

/// POST /api/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ApplicationCreate>,
) -> Result<(StatusCode, Json<ApplicationDetail>), AppError> {
    let store = state.store.as_ref();
    let label = normalize_status(&body.status)?;
    let (job, cv) = job_and_cv(store, auth.user_id, body.job_id, body.cv_id).await?;

    let cover_letter = if body.generate_cover_letter {
        Some(
            generate_cover_letter(
                state.llm.as_ref(),
                &cv,
                &job,
                &CoverLetterOptions::default(),
            )
            .await?,
        )
    } else {
        body.cover_letter
    };

    let application = store
        .create_application(
            auth.user_id,
            NewApplication {
                job_id: job.id,
                cv_id: cv.id,
                status: label,
                cover_letter,
                adapted_cv_content: None,
                notes: body.notes,
            },
        )
        .await?;
    info!(
        "Created application {} for job {} (user {})",
        application.id, job.id, auth.user_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApplicationDetail {
            application,
            job,
            cv,
        }),
    ))
}

/// PUT /api/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(mut body): Json<ApplicationUpdate>,
) -> Result<Json<ApplicationRow>, AppError> {
    if let Some(label) = &body.status {
        body.status = Some(normalize_status(label)?);
    }
    state
        .store
        .update_application(auth.user_id, id, body)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PATCH /api/applications/:id/status
/// Stamps the applied/response/interview date matching the new status.
pub async fn handle_update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> Result<Json<ApplicationRow>, AppError> {
    let update = status_change(&body.status, body.notes, Utc::now())?;
    let row = state
        .store
        .update_application(auth.user_id, id, update)
        .await?
        .ok_or_else(|| not_found(id))?;
    info!("Application {} moved to '{}'", row.id, row.status);
    Ok(Json(row))
}

/// DELETE /api/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_application(auth.user_id, id).await? {
        return Err(not_found(id));
    }
    info!("Deleted application {} of user {}", id, auth.user_id);
    Ok(Json(json!({"message": "Application deleted successfully"})))
}

/// POST /api/applications/:id/cover-letter
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(options): Json<CoverLetterOptions>,
) -> Result<Json<Value>, AppError> {
    let store = state.store.as_ref();
    let application = find_application(store, auth.user_id, id).await?;
    let (job, cv) = job_and_cv(store, auth.user_id, application.job_id, application.cv_id).await?;

    let letter = generate_cover_letter(state.llm.as_ref(), &cv, &job, &options).await?;
    store
        .update_application(
            auth.user_id,
            id,
            ApplicationUpdate {
                cover_letter: Some(letter.clone()),
                ..ApplicationUpdate::default()
            },
        )
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(json!({ "cover_letter": letter })))
}

/// POST /api/applications/:id/analysis
pub async fn handle_analyze_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationAnalysis>, AppError> {
    let store = state.store.as_ref();
    let application = find_application(store, auth.user_id, id).await?;
    let (job, cv) = job_and_cv(store, auth.user_id, application.job_id, application.cv_id).await?;
    Ok(Json(analyze_fit(store, state.llm.as_ref(), &cv, &job).await?))
}

/// GET /api/applications/analytics
pub async fn handle_analytics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApplicationAnalytics>, AppError> {
    Ok(Json(
        application_analytics(state.store.as_ref(), auth.user_id).await?,
    ))
}

/// GET /api/applications/recommendations
pub async fn handle_recommendations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let limit = query.limit.min(50);
    Ok(Json(
        recommend_jobs(state.store.as_ref(), auth.user_id, limit).await?,
    ))
}

/// POST /api/applications/batch
pub async fn handle_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    Ok(Json(run_batch(&state, auth.user_id, body).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    use crate::models::job::JobUpdate;
    use crate::test_support::{base_cv, new_job, parsed_cv_json, ScriptedLlm, TestApp};

    struct Fixture {
        app: TestApp,
        token: String,
        job: JobRow,
        cv: CvRow,
    }

    async fn fixture_with(llm: ScriptedLlm) -> Fixture {
        let app = TestApp::with_llm(llm);
        let (user, token) = app.user("ada@example.com").await;
        let job = app
            .state
            .store
            .create_job(new_job("manual_1", "Platform Engineer", &["Rust", "Kubernetes"]))
            .await
            .unwrap();
        let cv = base_cv(app.state.store.as_ref(), user.id, parsed_cv_json()).await;
        Fixture { app, token, job, cv }
    }

    async fn fixture() -> Fixture {
        fixture_with(ScriptedLlm::default()).await
    }

    async fn create(f: &Fixture, extra: Value) -> (StatusCode, Value) {
        let mut body = json!({"job_id": f.job.id, "cv_id": f.cv.id});
        if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        f.app
            .send(Method::POST, "/api/applications", Some(&f.token), Some(body))
            .await
    }

    #[tokio::test]
    async fn test_create_embeds_job_and_cv() {
        let f = fixture().await;
        let (status, created) = create(&f, json!({"notes": "Referral from Bob"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");
        assert_eq!(created["job"]["title"], "Platform Engineer");
        assert_eq!(created["cv"]["id"], f.cv.id.to_string());
        assert!(created["cover_letter"].is_null());

        let (status, list) = f
            .app
            .send(Method::GET, "/api/applications", Some(&f.token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["notes"], "Referral from Bob");
        assert_eq!(list[0]["job"]["id"], f.job.id.to_string());
    }

    #[tokio::test]
    async fn test_create_with_generated_cover_letter() {
        let f = fixture().await;
        let (status, created) = create(&f, json!({"generate_cover_letter": true})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["cover_letter"]
            .as_str()
            .unwrap()
            .starts_with("Dear Hiring Manager"));
        assert_eq!(f.app.llm.calls_for("cover_letter"), 1);
    }

    #[tokio::test]
    async fn test_create_requires_owned_cv_and_existing_job() {
        let f = fixture().await;
        let (_, other_token) = f.app.user("other@example.com").await;

        let (status, _) = f
            .app
            .send(
                Method::POST,
                "/api/applications",
                Some(&other_token),
                Some(json!({"job_id": f.job.id, "cv_id": f.cv.id})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = f
            .app
            .send(
                Method::POST,
                "/api/applications",
                Some(&f.token),
                Some(json!({"job_id": Uuid::new_v4(), "cv_id": f.cv.id})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = create(&f, json!({"status": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_patch_stamps_dates_and_allows_any_transition() {
        let f = fixture().await;
        let (_, created) = create(&f, json!({})).await;
        let uri = format!("/api/applications/{}/status", created["id"].as_str().unwrap());

        let (status, applied) = f
            .app
            .send(Method::PATCH, &uri, Some(&f.token), Some(json!({"status": "applied"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(applied["status"], "applied");
        assert!(applied["applied_date"].is_string());
        assert!(applied["response_date"].is_null());

        // Backwards is allowed: the label is free-form.
        let (status, back) = f
            .app
            .send(
                Method::PATCH,
                &uri,
                Some(&f.token),
                Some(json!({"status": "draft", "notes": "Rewriting the letter"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(back["status"], "draft");
        assert_eq!(back["notes"], "Rewriting the letter");
        assert_eq!(back["applied_date"], applied["applied_date"]);

        let (_, filtered) = f
            .app
            .send(Method::GET, "/api/applications?status=draft", Some(&f.token), None)
            .await;
        assert_eq!(filtered.as_array().unwrap().len(), 1);
        let (_, filtered) = f
            .app
            .send(Method::GET, "/api/applications?status=applied", Some(&f.token), None)
            .await;
        assert!(filtered.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let f = fixture().await;
        let (_, created) = create(&f, json!({})).await;
        let uri = format!("/api/applications/{}", created["id"].as_str().unwrap());

        let (status, updated) = f
            .app
            .send(
                Method::PUT,
                &uri,
                Some(&f.token),
                Some(json!({"cover_letter": "Hand-written letter", "status": "ready"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["cover_letter"], "Hand-written letter");
        assert_eq!(updated["status"], "ready");

        let (_, other_token) = f.app.user("other@example.com").await;
        let (status, _) = f.app.send(Method::DELETE, &uri, Some(&other_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = f.app.send(Method::DELETE, &uri, Some(&f.token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = f.app.send(Method::GET, &uri, Some(&f.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cover_letter_endpoint_stores_letter() {
        let f = fixture().await;
        let (_, created) = create(&f, json!({})).await;
        let id = created["id"].as_str().unwrap();

        let (status, body) = f
            .app
            .send(
                Method::POST,
                &format!("/api/applications/{id}/cover-letter"),
                Some(&f.token),
                Some(json!({"tone": "enthusiastic", "length": "short", "custom_points": ["Open source work"]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let letter = body["cover_letter"].as_str().unwrap();

        let (_, stored) = f
            .app
            .send(Method::GET, &format!("/api/applications/{id}"), Some(&f.token), None)
            .await;
        assert_eq!(stored["cover_letter"], letter);
    }

    #[tokio::test]
    async fn test_cover_letter_provider_failure_is_bad_gateway() {
        let f = fixture_with(ScriptedLlm::failing_cover_letters_for(&["Platform Engineer"])).await;
        let (_, created) = create(&f, json!({})).await;
        let (status, body) = f
            .app
            .send(
                Method::POST,
                &format!("/api/applications/{}/cover-letter", created["id"].as_str().unwrap()),
                Some(&f.token),
                Some(json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "LLM_ERROR");
    }

    #[tokio::test]
    async fn test_analysis_uses_stored_or_keyword_score() {
        let f = fixture().await;
        let (_, created) = create(&f, json!({})).await;
        let uri = format!("/api/applications/{}/analysis", created["id"].as_str().unwrap());

        let (status, analysis) = f.app.send(Method::POST, &uri, Some(&f.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analysis["missing_skills"], json!(["Kubernetes"]));
        let keyword_score = analysis["match_score"].as_f64().unwrap();
        assert_ne!(keyword_score, 12.0);
        assert!(keyword_score > 0.0);
        let stored = f.app.state.store.get_job(f.job.id).await.unwrap().unwrap();
        assert_eq!(stored.match_score, Some(keyword_score));

        f.app
            .state
            .store
            .update_job(
                f.job.id,
                JobUpdate {
                    match_score: Some(88.0),
                    ..JobUpdate::default()
                },
            )
            .await
            .unwrap();
        let (_, analysis) = f.app.send(Method::POST, &uri, Some(&f.token), None).await;
        assert_eq!(analysis["match_score"], 88.0);
    }

    #[tokio::test]
    async fn test_analytics_endpoint() {
        let f = fixture().await;
        let (_, first) = create(&f, json!({"status": "applied"})).await;
        create(&f, json!({"status": "interview_scheduled"})).await;
        assert_eq!(first["status"], "applied");

        let (status, analytics) = f
            .app
            .send(Method::GET, "/api/applications/analytics", Some(&f.token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analytics["total_applications"], 2);
        assert_eq!(analytics["status_breakdown"]["applied"], 1);
        assert_eq!(analytics["response_rate"], 100.0);
        assert_eq!(analytics["applications_this_month"], 2);
    }

    #[tokio::test]
    async fn test_recommendations_endpoint() {
        let f = fixture().await;
        let strong = f
            .app
            .state
            .store
            .create_job(new_job("manual_2", "Backend Engineer", &["Rust", "PostgreSQL"]))
            .await
            .unwrap();

        let (status, body) = f
            .app
            .send(
                Method::GET,
                "/api/applications/recommendations?limit=3",
                Some(&f.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let recommendations = body.as_array().unwrap();
        assert!(!recommendations.is_empty());
        assert_eq!(recommendations[0]["job"]["id"], strong.id.to_string());
        assert!(recommendations
            .iter()
            .all(|r| r["match_score"].as_f64().unwrap() > 50.0));
    }

    #[tokio::test]
    async fn test_batch_endpoint_reports_partial_failure() {
        let f = fixture_with(ScriptedLlm::failing_cover_letters_for(&["Doomed Role"])).await;
        let doomed = f
            .app
            .state
            .store
            .create_job(new_job("manual_2", "Doomed Role", &["Rust"]))
            .await
            .unwrap();

        let (status, report) = f
            .app
            .send(
                Method::POST,
                "/api/applications/batch",
                Some(&f.token),
                Some(json!({
                    "cv_id": f.cv.id,
                    "job_ids": [f.job.id, doomed.id],
                    "tone": "conversational"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["total"], 2);
        assert_eq!(report["successful"], 1);
        assert_eq!(report["failed"], 1);
        assert_eq!(report["results"][0]["outcome"], "succeeded");
        assert_eq!(report["results"][1]["outcome"], "failed");
        assert!(report["results"][1]["application_id"].is_string());
        assert_eq!(report["errors"].as_array().unwrap().len(), 1);

        let (status, _) = f
            .app
            .send(
                Method::POST,
                "/api/applications/batch",
                Some(&f.token),
                Some(json!({"cv_id": f.cv.id, "job_ids": []})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
