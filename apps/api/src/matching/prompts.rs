// Prompt templates for the compatibility judgment.

pub const JUDGMENT_SYSTEM: &str = "You are a senior Human Resources (HR) specialist who \
    evaluates how well a candidate's CV fits a job posting. You are candid and specific. \
    You respond with a single valid JSON object and nothing else.";

/// Fills the judgment prompt. Both texts are inserted verbatim in one pass, so braces
/// inside either text are never treated as placeholders.
pub fn build_judgment_prompt(resume_text: &str, job_text: &str) -> String {
    format!(
        r#"Analyze the following CV and JOB POSTING.

Your response MUST be a valid JSON object with exactly these keys:
- "score": an integer from 0 to 100 describing overall compatibility
- "pros": an array of short strings, the candidate's strengths for this role
- "cons": an array of short strings, gaps or weaknesses for this role
- "summary": one or two sentences summarising the fit

---[CV TEXT]---
{resume_text}
---[JOB POSTING TEXT]---
{job_text}
"#
    )
}
