use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::cvs::prompts::{CV_ADAPT_PROMPT, CV_ADAPT_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::{render, FACTUALITY_INSTRUCTION};
use crate::llm_client::{complete_json, CompletionRequest, LanguageModel, ModelTier};
use crate::models::cv::{CvRow, CvSections, NewCv};
use crate::models::job::JobRow;
use crate::store::Store;

fn build_prompt(cv: &CvRow, job: &JobRow, focus_areas: &[String]) -> Result<String, AppError> {
    let cv_json = serde_json::to_string_pretty(&cv.content)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize CV: {e}")))?;
    let focus = if focus_areas.is_empty() {
        String::new()
    } else {
        format!("Focus especially on: {}", focus_areas.join(", "))
    };

    Ok(render(
        CV_ADAPT_PROMPT,
        &[
            ("job_title", job.title.as_str()),
            ("company", job.company.as_str()),
            ("description", job.description.as_str()),
            ("requirements", job.requirements.as_str()),
            ("skills_required", job.skills_required.join(", ").as_str()),
            ("cv_json", cv_json.as_str()),
            ("focus", focus.as_str()),
            ("factuality", FACTUALITY_INSTRUCTION),
        ],
    ))
}

/// Produces a new CV tailored to `job_id` from the caller's CV `cv_id`.
///
/// The source CV is only read. The result is a separate row with
/// `is_base_cv = false` and `base_cv_id` pointing back at the source.
pub async fn adapt_cv(
    store: &dyn Store,
    llm: &dyn LanguageModel,
    owner_id: Uuid,
    cv_id: Uuid,
    job_id: Uuid,
    focus_areas: &[String],
) -> Result<CvRow, AppError> {
    let cv = store
        .get_cv(owner_id, cv_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("CV {cv_id} not found")))?;
    let job = store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let prompt = build_prompt(&cv, &job, focus_areas)?;
    let adapted: Value = complete_json(
        llm,
        CompletionRequest {
            task: "cv_adapt",
            system: CV_ADAPT_SYSTEM,
            prompt: &prompt,
            tier: ModelTier::Advanced,
            temperature: 0.3,
            max_tokens: 4000,
        },
    )
    .await
    .map_err(|e| AppError::Llm(format!("CV adaptation failed: {e}")))?;

    if !adapted.is_object() {
        return Err(AppError::Llm(
            "CV adaptation returned JSON that is not an object".to_string(),
        ));
    }

    let sections = CvSections::from_content(&adapted);
    let row = store
        .create_cv(
            owner_id,
            NewCv {
                title: format!("{} - Adapted for {}", cv.title, job.title),
                language: cv.language.clone(),
                content: adapted,
                sections,
                original_pdf_path: cv.original_pdf_path.clone(),
                is_base_cv: false,
                base_cv_id: Some(cv.id),
            },
        )
        .await?;

    info!("Adapted CV {} for job {} as CV {}", cv.id, job.id, row.id);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_job, TestApp};
    use serde_json::json;

    #[tokio::test]
    async fn test_adapt_creates_new_row_and_keeps_base() {
        let app = TestApp::new();
        let (user, _) = app.user("ada@example.com").await;
        let base = app
            .state
            .store
            .create_cv(
                user.id,
                serde_json::from_value::<crate::models::cv::CvCreate>(json!({
                    "title": "Base",
                    "content": {"summary": "original"},
                    "skills": ["Rust"],
                    "is_base_cv": true
                }))
                .unwrap()
                .into_new_cv(),
            )
            .await
            .unwrap();
        let job = app
            .state
            .store
            .create_job(new_job("manual_1", "Rust Engineer", &["Rust", "PostgreSQL"]))
            .await
            .unwrap();

        let adapted = adapt_cv(
            app.state.store.as_ref(),
            app.state.llm.as_ref(),
            user.id,
            base.id,
            job.id,
            &["Rust".to_string()],
        )
        .await
        .unwrap();

        assert_ne!(adapted.id, base.id);
        assert!(!adapted.is_base_cv);
        assert_eq!(adapted.base_cv_id, Some(base.id));
        assert_eq!(adapted.title, "Base - Adapted for Rust Engineer");
        assert_eq!(adapted.content["summary"], "Adapted summary for the target role.");

        let reloaded = app.state.store.get_cv(user.id, base.id).await.unwrap().unwrap();
        assert_eq!(reloaded.content, json!({"summary": "original"}));
        assert_eq!(reloaded.skills, vec!["Rust"]);
        assert!(reloaded.is_base_cv);
    }

    #[tokio::test]
    async fn test_adapt_requires_owned_cv_and_existing_job() {
        let app = TestApp::new();
        let (owner, _) = app.user("owner@example.com").await;
        let (other, _) = app.user("other@example.com").await;
        let cv = app
            .state
            .store
            .create_cv(
                owner.id,
                serde_json::from_value::<crate::models::cv::CvCreate>(json!({"title": "Base"}))
                    .unwrap()
                    .into_new_cv(),
            )
            .await
            .unwrap();
        let job = app
            .state
            .store
            .create_job(new_job("manual_2", "Data Engineer", &[]))
            .await
            .unwrap();

        let err = adapt_cv(
            app.state.store.as_ref(),
            app.state.llm.as_ref(),
            other.id,
            cv.id,
            job.id,
            &[],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = adapt_cv(
            app.state.store.as_ref(),
            app.state.llm.as_ref(),
            owner.id,
            cv.id,
            Uuid::new_v4(),
            &[],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(app.llm.calls_for("cv_adapt"), 0);
    }
}
