use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::application::{status, ApplicationUpdate};

/// Statuses are free-form labels: any value may follow any other. They are
/// only trimmed and bounded in length.
pub fn normalize_status(raw: &str) -> Result<String, AppError> {
    let label = raw.trim();
    if label.is_empty() {
        return Err(AppError::Validation("Status must not be empty".to_string()));
    }
    if label.chars().count() > status::MAX_LEN {
        return Err(AppError::Validation(format!(
            "Status must be at most {} characters",
            status::MAX_LEN
        )));
    }
    Ok(label.to_string())
}

/// Update for a status change, stamping the matching milestone date.
pub fn status_change(
    raw: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<ApplicationUpdate, AppError> {
    let label = normalize_status(raw)?;
    let mut update = ApplicationUpdate {
        notes: notes.filter(|n| !n.trim().is_empty()),
        ..ApplicationUpdate::default()
    };
    match label.as_str() {
        status::APPLIED => update.applied_date = Some(now),
        status::RESPONDED => update.response_date = Some(now),
        status::INTERVIEW_SCHEDULED => update.interview_date = Some(now),
        _ => {}
    }
    update.status = Some(label);
    Ok(update)
}
