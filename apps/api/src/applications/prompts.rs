/// Placeholders: `{job_title}`, `{company}`, `{description}`, `{requirements}`,
/// `{name}`, `{summary}`, `{skills}`, `{recent_position}`, `{length}`, `{tone}`,
/// `{custom_points}`, `{factuality}`.
pub const COVER_LETTER_PROMPT: &str = r#"Write a compelling cover letter for the following job application.

Job title: {job_title}
Company: {company}
Job description: {description}
Job requirements: {requirements}

Applicant's CV summary:
- Name: {name}
- Summary: {summary}
- Key skills: {skills}
- Most recent position: {recent_position}

Style requirements:
- Length: {length}
- Tone: {tone}
{custom_points}

Instructions:
1. Open strongly and name the specific position.
2. Highlight the experience and skills that match the job requirements.
3. Explain why the applicant wants to work for this company.
4. Give concrete examples of achievements taken from the CV.
5. Close with a clear call to action.

{factuality}

Write the complete letter without placeholders."#;

pub const ANALYSIS_SYSTEM: &str = "You are an expert recruiter who assesses how well a candidate fits a job. \
    You MUST respond with valid JSON only.";

/// Placeholders: `{description}`, `{requirements}`, `{skills_required}`, `{cv_json}`.
pub const ANALYSIS_PROMPT: &str = r#"Analyze how well this CV matches the job.

Job description: {description}
Job requirements: {requirements}
Skills required: {skills_required}

CV:
{cv_json}

Return a JSON object with exactly these keys:
- "match_score": number from 0 to 100
- "matching_skills": [string]
- "missing_skills": [string]
- "relevant_experience": [string]
- "strengths": [string]
- "improvements": [string]
- "recommendations": [string]"#;
