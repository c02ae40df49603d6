//! Batch application workflow.
//!
//! For each selected job, one after the other:
//!
//! 1. adapt the base CV to the job (focus: the first three required skills),
//! 2. create a `draft` application referencing the adapted CV,
//! 3. generate a cover letter,
//! 4. store the letter and mark the application `ready`.
//!
//! A failing step ends only that job's item. Rows created before the failure
//! are kept, so a cover-letter failure leaves a `draft` without a letter.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::applications::cover_letter::{generate_cover_letter, CoverLetterOptions, Length, Tone};
use crate::cvs::adaptation::adapt_cv;
use crate::errors::AppError;
use crate::models::application::{status, ApplicationUpdate, NewApplication};
use crate::state::AppState;

const FOCUS_SKILLS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub cv_id: Uuid,
    pub job_ids: Vec<Uuid>,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub job_id: Uuid,
    pub outcome: Outcome,
    pub adapted_cv_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
    pub errors: Vec<String>,
}

/// Ids created so far for one item; survives a failure half-way.
#[derive(Debug, Default)]
struct Progress {
    adapted_cv_id: Option<Uuid>,
    application_id: Option<Uuid>,
}

async fn process_job(
    state: &AppState,
    user_id: Uuid,
    cv_id: Uuid,
    job_id: Uuid,
    options: &CoverLetterOptions,
    progress: &mut Progress,
) -> Result<(), AppError> {
    let store = state.store.as_ref();
    let job = store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    let focus: Vec<String> = job.skills_required.iter().take(FOCUS_SKILLS).cloned().collect();

    let adapted = adapt_cv(store, state.llm.as_ref(), user_id, cv_id, job_id, &focus).await?;
    progress.adapted_cv_id = Some(adapted.id);

    let application = store
        .create_application(
            user_id,
            NewApplication {
                job_id,
                cv_id: adapted.id,
                status: status::DRAFT.to_string(),
                cover_letter: None,
                adapted_cv_content: Some(adapted.content.clone()),
                notes: None,
            },
        )
        .await?;
    progress.application_id = Some(application.id);

    let letter = generate_cover_letter(state.llm.as_ref(), &adapted, &job, options).await?;

    store
        .update_application(
            user_id,
            application.id,
            ApplicationUpdate {
                status: Some(status::READY.to_string()),
                cover_letter: Some(letter),
                ..ApplicationUpdate::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {} not found", application.id)))?;
    Ok(())
}

/// Runs the workflow for every job in `request.job_ids`, in order.
///
/// Fails as a whole only when `job_ids` is empty (400) or the base CV is not
/// the caller's (404); everything else is reported per item.
pub async fn run_batch(
    state: &AppState,
    user_id: Uuid,
    request: BatchRequest,
) -> Result<BatchReport, AppError> {
    if request.job_ids.is_empty() {
        return Err(AppError::Validation("job_ids must not be empty".to_string()));
    }
    state
        .store
        .get_cv(user_id, request.cv_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("CV {} not found", request.cv_id)))?;

    let options = CoverLetterOptions {
        tone: request.tone,
        length: request.length,
        custom_points: Vec::new(),
    };
    info!(
        "Batch for user {}: {} job(s) from CV {}",
        user_id,
        request.job_ids.len(),
        request.cv_id
    );

    let mut results = Vec::with_capacity(request.job_ids.len());
    let mut errors = Vec::new();
    for &job_id in &request.job_ids {
        let mut progress = Progress::default();
        let outcome =
            process_job(state, user_id, request.cv_id, job_id, &options, &mut progress).await;

        let (outcome, error) = match outcome {
            Ok(()) => (Outcome::Succeeded, None),
            Err(e) => {
                let message = format!("Job {job_id}: {}", e.report_message());
                warn!("Batch item failed: {message}");
                errors.push(message.clone());
                (Outcome::Failed, Some(message))
            }
        };
        results.push(BatchItemResult {
            job_id,
            outcome,
            adapted_cv_id: progress.adapted_cv_id,
            application_id: progress.application_id,
            error,
        });
    }

    let successful = results
        .iter()
        .filter(|r| r.outcome == Outcome::Succeeded)
        .count();
    let report = BatchReport {
        total: results.len(),
        successful,
        failed: results.len() - successful,
        results,
        errors,
    };
    info!(
        "Batch for user {} finished: {} succeeded, {} failed",
        user_id, report.successful, report.failed
    );
    Ok(report)
}
