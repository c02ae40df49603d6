//! Shared fixtures for handler and service tests: an in-memory store, a
//! scripted language model, and helpers to drive the real router.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::{create_access_token, hash_password};
use crate::config::Config;
use crate::jobs::sources::JobSourceRegistry;
use crate::llm_client::{CompletionRequest, LanguageModel, LlmError};
use crate::models::cv::{CvRow, CvSections, NewCv};
use crate::models::job::NewJob;
use crate::models::user::User;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::memory::MemoryStore;
use crate::store::Store;

/// A `LanguageModel` that answers by task label with canned content.
/// Cover letters fail for prompts mentioning any of `cover_letter_failures`.
#[derive(Default)]
pub struct ScriptedLlm {
    pub cover_letter_failures: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn failing_cover_letters_for(titles: &[&str]) -> Self {
        Self {
            cover_letter_failures: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls_for(&self, task: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|t| *t == task).count()
    }
}

pub fn parsed_cv_json() -> Value {
    json!({
        "personal_info": {"name": "Ada Example", "email": "ada@example.com", "location": "Berlin"},
        "summary": "Backend engineer with a focus on data systems.",
        "skills": {"technical": ["Rust", "PostgreSQL", "Docker"], "soft": ["Communication"]},
        "experience": [{
            "company": "Acme GmbH",
            "position": "Backend Engineer",
            "start_date": "2020-01",
            "end_date": "present",
            "description": "Built data pipelines and REST APIs in Rust and Python.",
            "achievements": ["Cut p99 latency by 40%"]
        }],
        "education": [{"institution": "TU Example", "degree": "MSc", "field": "Computer Science"}],
        "languages": [{"language": "English", "level": "C2"}]
    })
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(request.task.to_string());
        match request.task {
            "cv_parse" => Ok(parsed_cv_json().to_string()),
            "cv_adapt" => {
                let mut adapted = parsed_cv_json();
                adapted["summary"] = json!("Adapted summary for the target role.");
                Ok(format!("```json\n{adapted}\n```"))
            }
            "cover_letter" => {
                if self
                    .cover_letter_failures
                    .iter()
                    .any(|t| request.prompt.contains(t.as_str()))
                {
                    return Err(LlmError::Api {
                        status: 503,
                        message: "provider overloaded".to_string(),
                    });
                }
                Ok("Dear Hiring Manager,\n\nI am excited to apply.\n\nSincerely,\nAda".to_string())
            }
            "application_analysis" => Ok(json!({
                "match_score": 12,
                "matching_skills": ["Rust"],
                "missing_skills": ["Kubernetes"],
                "strengths": ["Backend experience"],
                "improvements": ["Mention cloud work"],
                "recommendations": ["Highlight the latency project"]
            })
            .to_string()),
            other => Err(LlmError::Api {
                status: 400,
                message: format!("unscripted task '{other}'"),
            }),
        }
    }

    async fn ping(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

pub fn new_job(external_id: &str, title: &str, skills: &[&str]) -> NewJob {
    serde_json::from_value(json!({
        "external_id": external_id,
        "title": title,
        "company": "Acme",
        "location": "Berlin, Germany",
        "description": format!("{title} role building backend services"),
        "requirements": "3+ years of backend experience",
        "skills_required": skills,
        "experience_level": "mid",
        "job_type": "full-time"
    }))
    .unwrap()
}

/// Stores a base CV built from a structured document.
pub async fn base_cv(store: &dyn Store, owner_id: uuid::Uuid, content: Value) -> CvRow {
    store
        .create_cv(
            owner_id,
            NewCv {
                title: "Base CV".to_string(),
                language: "en".to_string(),
                sections: CvSections::from_content(&content),
                content,
                original_pdf_path: None,
                is_base_cv: true,
                base_cv_id: None,
            },
        )
        .await
        .unwrap()
}

pub fn test_config(upload_dir: &Path) -> Config {
    let env: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/jobpilot_test".to_string()),
        ("OPENROUTER_API_KEY", "sk-or-test-key-123456".to_string()),
        ("SECRET_KEY", "test-secret-key-that-is-long-enough-123".to_string()),
        ("UPLOAD_DIR", upload_dir.display().to_string()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<ScriptedLlm>,
    pub upload_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_llm(ScriptedLlm::default())
    }

    pub fn with_llm(llm: ScriptedLlm) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = test_config(upload_dir.path());
        Self::with_config(llm, config, upload_dir)
    }

    pub fn with_config(llm: ScriptedLlm, config: Config, upload_dir: tempfile::TempDir) -> Self {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(llm);
        let state = AppState {
            store: store.clone(),
            llm: llm.clone(),
            sources: Arc::new(JobSourceRegistry::from_config(&config.job_sources).unwrap()),
            config: Arc::new(config),
        };
        Self {
            state,
            store,
            llm,
            upload_dir,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Creates a user directly in the store and returns it with a valid token.
    pub async fn user(&self, email: &str) -> (User, String) {
        let hash = hash_password("password123").unwrap();
        let user = self.store.create_user(email, &hash).await.unwrap();
        let token = create_access_token(
            user.id,
            &user.email,
            &self.state.config.auth.secret_key,
            self.state.config.auth.access_token_expire_minutes,
        )
        .unwrap();
        (user, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
