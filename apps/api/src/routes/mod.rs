pub mod health;
pub mod settings;
pub mod status;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::applications::handlers as applications;
use crate::auth::handlers as auth;
use crate::cvs::handlers as cvs;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Upper bound for request bodies, sized for CV PDF uploads.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/status/health", get(status::handle_system_status))
        // Auth
        .route("/api/auth/register", post(auth::handle_register))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/me", get(auth::handle_me))
        // CVs
        .route("/api/cvs", get(cvs::handle_list_cvs).post(cvs::handle_create_cv))
        .route("/api/cvs/upload", post(cvs::handle_upload_cv))
        .route(
            "/api/cvs/initialize-from-source",
            post(cvs::handle_initialize_from_source),
        )
        .route(
            "/api/cvs/:id",
            get(cvs::handle_get_cv)
                .put(cvs::handle_update_cv)
                .delete(cvs::handle_delete_cv),
        )
        .route("/api/cvs/:id/adapt", post(cvs::handle_adapt_cv))
        // Jobs
        .route("/api/jobs", get(jobs::handle_list_jobs).post(jobs::handle_create_job))
        .route("/api/jobs/search", post(jobs::handle_search_jobs))
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/jobs/:id/match", post(jobs::handle_match_job))
        // Applications
        .route(
            "/api/applications",
            get(applications::handle_list_applications)
                .post(applications::handle_create_application),
        )
        .route("/api/applications/batch", post(applications::handle_batch))
        .route(
            "/api/applications/analytics",
            get(applications::handle_analytics),
        )
        .route(
            "/api/applications/recommendations",
            get(applications::handle_recommendations),
        )
        .route(
            "/api/applications/:id",
            get(applications::handle_get_application)
                .put(applications::handle_update_application)
                .delete(applications::handle_delete_application),
        )
        .route(
            "/api/applications/:id/status",
            patch(applications::handle_update_status),
        )
        .route(
            "/api/applications/:id/cover-letter",
            post(applications::handle_generate_cover_letter),
        )
        .route(
            "/api/applications/:id/analysis",
            post(applications::handle_analyze_application),
        )
        // Settings
        .route(
            "/api/settings/job-search-services",
            get(settings::handle_job_search_services),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
