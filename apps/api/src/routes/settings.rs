use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::state::AppState;

/// GET /api/settings/job-search-services
/// Every known job source keyed by id, with its configuration state.
pub async fn handle_job_search_services(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<Value> {
    let services: BTreeMap<&str, _> = state
        .sources
        .service_settings()
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    Json(json!({ "services": services }))
}
