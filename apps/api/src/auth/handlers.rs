use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{create_access_token, hash_password, verify_password, AuthUser};
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// Trims and lowercases an email and checks it has the `local@domain.tld` shape.
fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation(format!("'{}' is not a valid email address", raw.trim())))
    }
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let email = normalize_email(&body.email)?;
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hash = hash_password(&body.password)?;
    let user = state.store.create_user(&email, &hash).await?;
    info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<TokenResponse>, AppError> {
    let email = body.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? || !user.is_active {
        return Err(AppError::Unauthorized);
    }

    let ttl = state.config.auth.access_token_expire_minutes;
    let access_token = create_access_token(user.id, &user.email, &state.config.auth.secret_key, ttl)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: ttl * 60,
    }))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Ada@Example.COM ").unwrap(), "ada@example.com");
        for bad in ["", "ada", "@example.com", "ada@example", "ada@@example.com", "a da@x.io"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_register_login_me() {
        let app = TestApp::new();
        let (status, user) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "Ada@Example.com", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["email"], "ada@example.com");
        assert!(user.get("password_hash").is_none());

        let (status, token) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "ada@example.com", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(token["token_type"], "bearer");
        assert_eq!(token["expires_in"], 30 * 60);

        let access = token["access_token"].as_str().unwrap();
        let (status, me) = app.send(Method::GET, "/api/auth/me", Some(access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], user["id"]);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let app = TestApp::new();
        let body = json!({"email": "ada@example.com", "password": "password123"});
        let (status, _) = app
            .send(Method::POST, "/api/auth/register", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, err) = app
            .send(Method::POST, "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_register_short_password_rejected() {
        let app = TestApp::new();
        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "ada@example.com", "password": "short"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_password_unauthorized() {
        let app = TestApp::new();
        app.user("ada@example.com").await;
        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "ada@example.com", "password": "not-the-password"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "nobody@example.com", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_endpoints_require_token() {
        let app = TestApp::new();
        let (_, token) = app.user("ada@example.com").await;
        let protected = [
            (Method::GET, "/api/auth/me"),
            (Method::GET, "/api/cvs"),
            (Method::GET, "/api/jobs"),
            (Method::POST, "/api/jobs/search"),
            (Method::GET, "/api/applications"),
            (Method::POST, "/api/applications/batch"),
            (Method::GET, "/api/applications/analytics"),
            (Method::GET, "/api/settings/job-search-services"),
        ];
        for (method, uri) in protected {
            let (status, body) = app.send(method.clone(), uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(body["error"]["code"], "UNAUTHORIZED");

            let (status, _) = app
                .send(method.clone(), uri, Some("not-a-jwt"), None)
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} with garbage token");
        }

        // A valid token still works.
        let (status, _) = app.send(Method::GET, "/api/cvs", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_of_deleted_user_rejected() {
        let app = TestApp::new();
        let token = create_access_token(
            uuid::Uuid::new_v4(),
            "ghost@example.com",
            &app.state.config.auth.secret_key,
            30,
        )
        .unwrap();
        let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
