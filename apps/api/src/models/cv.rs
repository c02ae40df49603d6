use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CvRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub language: String,
    pub content: Value,
    pub skills: Vec<String>,
    pub experience: Value,
    pub education: Value,
    pub personal_info: Value,
    pub original_pdf_path: Option<String>,
    pub is_base_cv: bool,
    /// Set on adapted CVs: the CV this one was derived from.
    pub base_cv_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Store input for a new CV row.
#[derive(Debug, Clone)]
pub struct NewCv {
    pub title: String,
    pub language: String,
    pub content: Value,
    pub sections: CvSections,
    pub original_pdf_path: Option<String>,
    pub is_base_cv: bool,
    pub base_cv_id: Option<Uuid>,
}

/// Request body for `POST /api/cvs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CvCreate {
    pub title: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Value>,
    #[serde(default)]
    pub education: Vec<Value>,
    #[serde(default)]
    pub personal_info: Map<String, Value>,
    #[serde(default)]
    pub is_base_cv: bool,
}

impl CvCreate {
    pub fn into_new_cv(self) -> NewCv {
        NewCv {
            title: self.title,
            language: self.language,
            content: Value::Object(self.content),
            sections: CvSections {
                skills: self.skills,
                experience: self.experience,
                education: self.education,
                personal_info: self.personal_info,
            },
            original_pdf_path: None,
            is_base_cv: self.is_base_cv,
            base_cv_id: None,
        }
    }
}

/// Partial update body for `PUT /api/cvs/:id`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CvUpdate {
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: Option<Map<String, Value>>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<Vec<Value>>,
    pub education: Option<Vec<Value>>,
    pub personal_info: Option<Map<String, Value>>,
}

fn default_language() -> String {
    "en".to_string()
}

/// The denormalized sections kept next to the full CV content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvSections {
    pub skills: Vec<String>,
    pub experience: Vec<Value>,
    pub education: Vec<Value>,
    pub personal_info: Map<String, Value>,
}

impl CvSections {
    /// Pulls the sections out of a structured CV document as returned by the LLM.
    ///
    /// `skills` is accepted as a flat list of strings, a list of `{"name": ..}`
    /// objects, or an object of categorized lists; it is flattened and
    /// de-duplicated case-insensitively, keeping first-seen order.
    pub fn from_content(content: &Value) -> Self {
        let experience = content
            .get("experience")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let education = content
            .get("education")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let personal_info = content
            .get("personal_info")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut skills = Vec::new();
        if let Some(raw) = content.get("skills") {
            collect_skills(raw, &mut skills);
        }
        let mut seen = std::collections::HashSet::new();
        skills.retain(|s| seen.insert(s.to_lowercase()));

        Self {
            skills,
            experience,
            education,
            personal_info,
        }
    }
}

fn collect_skills(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_skills(item, out)),
        Value::Object(map) => match map.get("name") {
            Some(Value::String(name)) => collect_skills(&Value::String(name.clone()), out),
            _ => map.values().for_each(|v| collect_skills(v, out)),
        },
        _ => {}
    }
}
