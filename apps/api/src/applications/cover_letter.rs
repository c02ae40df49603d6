//! Cover letter generation from a CV and a job posting.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::applications::prompts::COVER_LETTER_PROMPT;
use crate::errors::AppError;
use crate::llm_client::prompts::{render, FACTUALITY_INSTRUCTION, WRITER_SYSTEM};
use crate::llm_client::{CompletionRequest, LanguageModel, ModelTier};
use crate::models::cv::CvRow;
use crate::models::job::JobRow;

const MAX_PROMPT_SKILLS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Enthusiastic,
    Conversational,
}

impl Tone {
    fn guide(self) -> &'static str {
        match self {
            Tone::Professional => "formal, business-like tone",
            Tone::Enthusiastic => "energetic and passionate tone",
            Tone::Conversational => "friendly but professional tone",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Short,
    #[default]
    Medium,
    Long,
}

impl Length {
    fn guide(self) -> &'static str {
        match self {
            Length::Short => "2-3 paragraphs, around 150-200 words",
            Length::Medium => "3-4 paragraphs, around 250-350 words",
            Length::Long => "4-5 paragraphs, around 400-500 words",
        }
    }
}

/// Body of `POST /api/applications/:id/cover-letter`; also embedded in batch requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverLetterOptions {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: Length,
    #[serde(default)]
    pub custom_points: Vec<String>,
}

fn content_str<'a>(content: &'a Value, key: &str) -> &'a str {
    content.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn build_prompt(cv: &CvRow, job: &JobRow, options: &CoverLetterOptions) -> String {
    let name = cv
        .personal_info
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("Applicant");
    let recent_position = cv
        .experience
        .as_array()
        .and_then(|entries| entries.first())
        .map(|entry| content_str(entry, "position"))
        .unwrap_or_default();
    let skills: Vec<&str> = cv
        .skills
        .iter()
        .take(MAX_PROMPT_SKILLS)
        .map(String::as_str)
        .collect();
    let custom_points = if options.custom_points.is_empty() {
        String::new()
    } else {
        format!(
            "- Include these specific points: {}",
            options.custom_points.join(", ")
        )
    };

    render(
        COVER_LETTER_PROMPT,
        &[
            ("job_title", job.title.as_str()),
            ("company", job.company.as_str()),
            ("description", job.description.as_str()),
            ("requirements", job.requirements.as_str()),
            ("name", name),
            ("summary", content_str(&cv.content, "summary")),
            ("skills", skills.join(", ").as_str()),
            ("recent_position", recent_position),
            ("length", options.length.guide()),
            ("tone", options.tone.guide()),
            ("custom_points", custom_points.as_str()),
            ("factuality", FACTUALITY_INSTRUCTION),
        ],
    )
}

/// Writes a cover letter for `job` from `cv`. The letter is returned, not stored.
pub async fn generate_cover_letter(
    llm: &dyn LanguageModel,
    cv: &CvRow,
    job: &JobRow,
    options: &CoverLetterOptions,
) -> Result<String, AppError> {
    let prompt = build_prompt(cv, job, options);
    let letter = llm
        .complete(CompletionRequest {
            task: "cover_letter",
            system: WRITER_SYSTEM,
            prompt: &prompt,
            tier: ModelTier::Advanced,
            temperature: 0.8,
            max_tokens: 2000,
        })
        .await
        .map_err(|e| AppError::Llm(format!("Cover letter generation failed: {e}")))?;

    let letter = letter.trim();
    if letter.is_empty() {
        return Err(AppError::Llm(
            "Cover letter generation returned an empty letter".to_string(),
        ));
    }
    info!("Generated cover letter for job {} from CV {}", job.id, cv.id);
    Ok(letter.to_string())
}
