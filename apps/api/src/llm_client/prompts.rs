// Cross-cutting prompt fragments. Each feature module keeps its own prompts.rs.

/// System prompt for free-text writing tasks (cover letters).
pub const WRITER_SYSTEM: &str = "You are an experienced career coach and professional writer. \
    Write in the requested language and register. \
    Return only the requested text, without a preamble or closing remarks.";

/// Instruction shared by every prompt that rewrites candidate material.
pub const FACTUALITY_INSTRUCTION: &str = "\
    CRITICAL: Only use facts present in the candidate's CV. \
    Do NOT invent employers, dates, degrees, certifications or metrics. \
    Reorder and rephrase, but never fabricate.";

/// Fills `{key}` placeholders of `template` in a single pass.
///
/// Substituted values are never scanned again, so placeholder-like text inside
/// a job posting or CV stays literal. Braces that do not name a known key are
/// kept as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let value = tail.find('}').and_then(|end| {
            let key = &tail[..end];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (end, *v))
        });
        match value {
            Some((end, v)) => {
                out.push_str(v);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
