//! PDF → text → structured CV.
//!
//! Text extraction is CPU-bound and runs on the blocking pool. The structured
//! form comes from a single LLM call on the default model tier.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cvs::prompts::{CV_PARSE_PROMPT, CV_PARSE_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::render;
use crate::llm_client::{complete_json, CompletionRequest, LanguageModel, ModelTier};
use crate::models::cv::{CvRow, CvSections, NewCv};
use crate::state::AppState;
use crate::store::Store;

/// CV text beyond this many characters is cut before prompting.
const MAX_CV_TEXT_CHARS: usize = 30_000;

/// Extracts the text layer of a PDF. A PDF without any text (e.g. a scan)
/// is unprocessable.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            // The extractor panics on some malformed documents.
            if e.is_panic() {
                AppError::UnprocessableEntity("Could not read PDF".to_string())
            } else {
                AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}"))
            }
        })?
        .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?;

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "The PDF contains no extractable text".to_string(),
        ));
    }
    Ok(text)
}

/// Asks the LLM to turn raw CV text into the structured CV document.
pub async fn parse_cv_text(
    llm: &dyn LanguageModel,
    text: &str,
    language: &str,
) -> Result<Value, AppError> {
    let text: String = text.chars().take(MAX_CV_TEXT_CHARS).collect();
    let prompt = render(CV_PARSE_PROMPT, &[("language", language), ("cv_text", text.as_str())]);

    let parsed: Value = complete_json(
        llm,
        CompletionRequest {
            task: "cv_parse",
            system: CV_PARSE_SYSTEM,
            prompt: &prompt,
            tier: ModelTier::Default,
            temperature: 0.1,
            max_tokens: 4000,
        },
    )
    .await
    .map_err(|e| AppError::Llm(format!("CV parsing failed: {e}")))?;

    if !parsed.is_object() {
        return Err(AppError::Llm(
            "CV parsing returned JSON that is not an object".to_string(),
        ));
    }
    Ok(parsed)
}

/// Parses CV text and stores the result as a base CV of `owner_id`.
pub async fn create_cv_from_text(
    store: &dyn Store,
    llm: &dyn LanguageModel,
    owner_id: Uuid,
    text: &str,
    title: &str,
    language: &str,
    original_pdf_path: Option<String>,
) -> Result<CvRow, AppError> {
    let content = parse_cv_text(llm, text, language).await?;
    let sections = CvSections::from_content(&content);

    store
        .create_cv(
            owner_id,
            NewCv {
                title: title.to_string(),
                language: language.to_string(),
                content,
                sections,
                original_pdf_path,
                is_base_cv: true,
                base_cv_id: None,
            },
        )
        .await
}

/// Only the final path component of a client-supplied file name is kept.
fn safe_file_name(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .filter(|n| !n.is_empty())
}

fn is_pdf_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Stores an uploaded PDF as `<owner>_<file name>` under the upload directory
/// and creates a base CV from it. The file is removed again if any later
/// step fails.
pub async fn import_uploaded_pdf(
    state: &AppState,
    owner_id: Uuid,
    file_name: &str,
    bytes: Vec<u8>,
    title: &str,
    language: &str,
) -> Result<CvRow, AppError> {
    let file_name = safe_file_name(file_name)
        .filter(|n| is_pdf_name(n))
        .ok_or_else(|| AppError::Validation("Only PDF files are supported".to_string()))?;

    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create upload directory: {e}")))?;
    let path = upload_dir.join(format!("{owner_id}_{file_name}"));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to store uploaded CV: {e}")))?;

    let result = async {
        let text = extract_pdf_text(bytes).await?;
        create_cv_from_text(
            state.store.as_ref(),
            state.llm.as_ref(),
            owner_id,
            &text,
            title,
            language,
            Some(path.display().to_string()),
        )
        .await
    }
    .await;

    match result {
        Ok(cv) => {
            info!("Imported CV {} from {}", cv.id, path.display());
            Ok(cv)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove {} after import error: {rm}", path.display());
            }
            Err(e)
        }
    }
}

/// `DE` anywhere in the file name as a separate token marks a German CV.
pub fn language_from_file_name(path: &Path) -> &'static str {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let german = stem
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token.eq_ignore_ascii_case("de"));
    if german {
        "de"
    } else {
        "en"
    }
}

/// Expands the configured CV source paths: files are taken as-is, directories
/// are scanned (non-recursively) for `*.pdf`.
pub fn collect_pdf_paths(sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for source in sources {
        if source.is_dir() {
            match std::fs::read_dir(source) {
                Ok(entries) => {
                    let mut pdfs: Vec<PathBuf> = entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.is_file() && p.to_str().is_some_and(is_pdf_name))
                        .collect();
                    pdfs.sort();
                    found.extend(pdfs);
                }
                Err(e) => warn!("Cannot read CV source directory {}: {e}", source.display()),
            }
        } else if source.is_file() {
            found.push(source.clone());
        } else {
            warn!("CV source path does not exist: {}", source.display());
        }
    }
    found
}

/// Creates a base CV for every PDF under the configured source paths.
/// A file that fails to read or parse is logged and skipped.
pub async fn initialize_from_sources(
    state: &AppState,
    owner_id: Uuid,
) -> Result<Vec<CvRow>, AppError> {
    let mut created = Vec::new();
    for path in collect_pdf_paths(&state.config.cv_source_paths) {
        let language = language_from_file_name(&path);
        let title = format!("Base CV ({})", language.to_uppercase());

        let outcome = async {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read CV file: {e}")))?;
            let text = extract_pdf_text(bytes).await?;
            create_cv_from_text(
                state.store.as_ref(),
                state.llm.as_ref(),
                owner_id,
                &text,
                &title,
                language,
                Some(path.display().to_string()),
            )
            .await
        }
        .await;

        match outcome {
            Ok(cv) => created.push(cv),
            Err(e) => warn!("Skipping CV source {}: {}", path.display(), e.report_message()),
        }
    }
    info!("Initialized {} CV(s) from configured sources", created.len());
    Ok(created)
}
