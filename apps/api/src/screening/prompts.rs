//! Screening prompt template and the builder that fills it in.

use thiserror::Error;

const JD_PLACEHOLDER: &str = "{jd}";
const RESUME_PLACEHOLDER: &str = "{resume_text}";

/// Screening prompt template. `{jd}` and `{resume_text}` are substituted
/// by `build_screening_prompt`.
pub const SCREENING_PROMPT_TEMPLATE: &str = r#"You are an expert HR professional with extensive experience in technical recruitment and talent acquisition.
Your task is to meticulously evaluate a candidate's resume against a given job description.

Please provide the following:
1.  **Match Score:** A percentage representing how well the resume matches the job description.
2.  **Profile Summary:** A concise, professional summary of the candidate's profile based on their resume.
3.  **Strengths & Alignment:** A brief analysis of what makes the candidate a strong fit for this role, highlighting key skills, experience, and qualifications that align directly with the job description.
4.  **Potential Gaps:** Identify any noticeable gaps or areas where the candidate's experience does not align with the job requirements.

**Job Description:**
{jd}

**Candidate's Resume:**
{resume_text}

---
**Output Format (Strict):**
**Match Score:** [percentage]%
**Profile Summary:** [summary]
**Strengths & Alignment:** [analysis of strengths]
**Potential Gaps:** [analysis of gaps]
"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("a job description is required")]
    MissingJobDescription,

    #[error("no text could be extracted from the resume")]
    MissingResumeText,
}

/// Renders the screening prompt for one resume.
///
/// Both inputs are inserted verbatim. Substitution is a single pass over the
/// template, so placeholder-looking text inside the inputs is left alone.
pub fn build_screening_prompt(job_description: &str, resume_text: &str) -> Result<String, PromptError> {
    if job_description.trim().is_empty() {
        return Err(PromptError::MissingJobDescription);
    }
    if resume_text.trim().is_empty() {
        return Err(PromptError::MissingResumeText);
    }

    Ok(render(SCREENING_PROMPT_TEMPLATE, job_description, resume_text))
}

fn render(template: &str, job_description: &str, resume_text: &str) -> String {
    let mut out =
        String::with_capacity(template.len() + job_description.len() + resume_text.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(JD_PLACEHOLDER) {
            out.push_str(job_description);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(RESUME_PLACEHOLDER) {
            out.push_str(resume_text);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
