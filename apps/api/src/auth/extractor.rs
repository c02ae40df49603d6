use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use crate::auth::validate_access_token;
use crate::errors::AppError;
use crate::state::AppState;

/// The authenticated caller. Extracting it validates the bearer token and
/// re-loads the user, so tokens of deleted or deactivated users stop working
/// immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let claims = validate_access_token(token, &state.config.auth.secret_key).map_err(|e| {
            debug!("Rejected access token: {e:#}");
            AppError::Unauthorized
        })?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

        let user = state
            .store
            .find_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { user_id: user.id })
    }
}
