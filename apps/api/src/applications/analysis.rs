use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::applications::prompts::{ANALYSIS_PROMPT, ANALYSIS_SYSTEM};
use crate::errors::AppError;
use crate::jobs::scoring::cv_match_score;
use crate::llm_client::prompts::render;
use crate::llm_client::{complete_json, CompletionRequest, LanguageModel, ModelTier};
use crate::models::cv::CvRow;
use crate::models::job::{JobRow, JobUpdate};
use crate::store::Store;

/// LLM assessment of a CV against a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAnalysis {
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub relevant_experience: Vec<Value>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// The model's own score is replaced by the job's stored match score. When
/// none is stored, the keyword match score is used and saved on the job.
pub async fn analyze_fit(
    store: &dyn Store,
    llm: &dyn LanguageModel,
    cv: &CvRow,
    job: &JobRow,
) -> Result<ApplicationAnalysis, AppError> {
    let cv_json = serde_json::to_string_pretty(&cv.content)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize CV: {e}")))?;
    let prompt = render(
        ANALYSIS_PROMPT,
        &[
            ("description", job.description.as_str()),
            ("requirements", job.requirements.as_str()),
            ("skills_required", job.skills_required.join(", ").as_str()),
            ("cv_json", cv_json.as_str()),
        ],
    );

    let mut analysis: ApplicationAnalysis = complete_json(
        llm,
        CompletionRequest {
            task: "application_analysis",
            system: ANALYSIS_SYSTEM,
            prompt: &prompt,
            tier: ModelTier::Advanced,
            temperature: 0.3,
            max_tokens: 2000,
        },
    )
    .await
    .map_err(|e| AppError::Llm(format!("Application analysis failed: {e}")))?;

    analysis.match_score = match job.match_score {
        Some(score) if score > 0.0 => score,
        _ => {
            let score = cv_match_score(job, cv);
            store
                .update_job(
                    job.id,
                    JobUpdate {
                        match_score: Some(score),
                        ..JobUpdate::default()
                    },
                )
                .await?;
            score
        }
    };
    info!(
        "Analyzed CV {} against job {} (match score {:.1})",
        cv.id, job.id, analysis.match_score
    );
    Ok(analysis)
}
