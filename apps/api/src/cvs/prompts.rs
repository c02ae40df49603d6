pub const CV_PARSE_SYSTEM: &str = "You are an expert CV parser. \
    You extract structured data from the raw text of a CV without rewriting or embellishing it. \
    You MUST respond with valid JSON only.";

/// Placeholders: `{language}`, `{cv_text}`.
pub const CV_PARSE_PROMPT: &str = r#"Parse the following CV text and extract structured information.
The CV is written in the language with code "{language}"; keep values in that language.

Return a JSON object with exactly these keys:
- "personal_info": {"name", "email", "phone", "address", "linkedin", "github"}
- "summary": a brief professional summary taken from the CV (string)
- "experience": [{"company", "position", "start_date", "end_date", "description", "achievements": [string]}]
- "education": [{"institution", "degree", "field", "start_date", "end_date", "gpa"}]
- "skills": [string]  (technical and soft skills, one entry per skill)
- "certifications": [string]
- "languages": [{"language", "proficiency"}]

Use null for values that are not present. Do not invent anything.

CV text:
{cv_text}"#;

pub const CV_ADAPT_SYSTEM: &str = "You are an expert career coach who tailors CVs to job postings. \
    You MUST respond with valid JSON only, using the same structure as the CV you are given.";

/// Placeholders: `{job_title}`, `{company}`, `{description}`, `{requirements}`,
/// `{skills_required}`, `{cv_json}`, `{focus}`, `{factuality}`.
pub const CV_ADAPT_PROMPT: &str = r#"Adapt the following CV for a specific job application.

Job title: {job_title}
Company: {company}
Job description: {description}
Requirements: {requirements}
Skills required: {skills_required}

Current CV (JSON):
{cv_json}

{focus}

Instructions:
1. Reorder and emphasize the experience that matches the job requirements.
2. Highlight the skills that match the job requirements.
3. Rewrite the professional summary to align with the position.
4. Use keywords from the job description where they truthfully apply.
5. Keep the same JSON structure and keys as the current CV.

{factuality}

Return the adapted CV as a single JSON object."#;
