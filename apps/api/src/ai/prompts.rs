// Prompt constants for the AI features. Shared fragments live in llm_client::prompts.

use crate::llm_client::prompts::{clip, FACTUALITY_INSTRUCTION};

/// Longest CV rendering embedded in a prompt.
pub const MAX_CV_CHARS: usize = 12_000;
/// Longest job description embedded in a prompt.
pub const MAX_JD_CHARS: usize = 6_000;
/// Longest fragment accepted for rewriting.
pub const MAX_FRAGMENT_CHARS: usize = 2_000;

pub const WRITER_SYSTEM: &str = "You are an expert CV writer and career coach. \
    You write concise, specific, achievement-oriented CV content in plain text. \
    Respond with the rewritten content only: no preamble, no quotes, no markdown.";

pub const ENHANCE_SUMMARY_INSTRUCTION: &str = "Rewrite this professional summary in 3 to 4 \
    sentences. Lead with the candidate's role and strongest expertise, then concrete results.";

pub const ENHANCE_BULLET_INSTRUCTION: &str = "Rewrite this CV bullet as a single line that \
    starts with a strong past-tense action verb and states the outcome. Keep any numbers given.";

pub const ENHANCE_DESCRIPTION_INSTRUCTION: &str = "Rewrite this description in 2 to 3 clear \
    sentences focused on scope, responsibilities and impact.";

pub const SUMMARY_TEMPLATE: &str = r#"Write a professional summary of 3 to 4 sentences for the CV below.
{target}
{factuality}

CV:
{cv}"#;

pub const ENHANCE_TEMPLATE: &str = r#"{instruction}
{context}
{factuality}

Text to rewrite:
{text}"#;

pub const ATS_TEMPLATE: &str = r#"You are an Applicant Tracking System (ATS) analyst.
Evaluate how well the CV below would be parsed and ranked by an ATS{jd_clause}.

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": 72,
  "checks": [
    {"name": "contact", "passed": true, "detail": "Email and phone present"}
  ],
  "matched_keywords": ["rust", "postgresql"],
  "missing_keywords": ["kubernetes"],
  "suggestions": ["Quantify the impact of your most recent role"]
}

Rules:
- score is an integer from 0 to 100.
- Only list keywords that appear in the job description.
- Suggestions must be specific to this CV; at most 6.

CV:
{cv}
{jd}"#;

pub fn summary_prompt(cv_text: &str, target_role: Option<&str>) -> String {
    let target = match target_role.map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => format!("Tailor it to a {} position.", clip(role, 200)),
        None => String::new(),
    };
    SUMMARY_TEMPLATE
        .replace("{target}", &target)
        .replace("{factuality}", FACTUALITY_INSTRUCTION)
        .replace("{cv}", clip(cv_text, MAX_CV_CHARS))
}

pub fn enhance_prompt(instruction: &str, text: &str, context: Option<&str>) -> String {
    let context = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("Context: {}", clip(c, 500)),
        None => String::new(),
    };
    ENHANCE_TEMPLATE
        .replace("{instruction}", instruction)
        .replace("{context}", &context)
        .replace("{factuality}", FACTUALITY_INSTRUCTION)
        .replace("{text}", clip(text, MAX_FRAGMENT_CHARS))
}

pub fn ats_prompt(cv_text: &str, job_description: Option<&str>) -> String {
    let (jd_clause, jd) = match job_description {
        Some(jd) => (
            " for the job description that follows it",
            format!("\nJOB DESCRIPTION:\n{}", clip(jd, MAX_JD_CHARS)),
        ),
        None => ("", String::new()),
    };
    ATS_TEMPLATE
        .replace("{jd_clause}", jd_clause)
        .replace("{cv}", clip(cv_text, MAX_CV_CHARS))
        .replace("{jd}", &jd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_includes_role_and_cv() {
        let prompt = summary_prompt("Ada Lovelace\nProgrammer", Some("Staff Engineer"));
        assert!(prompt.contains("Tailor it to a Staff Engineer position."));
        assert!(prompt.contains("Ada Lovelace"));
        assert!(prompt.contains("Do NOT invent"));
        assert!(!prompt.contains("{cv}"));
    }

    #[test]
    fn test_enhance_prompt_clips_text() {
        let long = "x".repeat(MAX_FRAGMENT_CHARS + 50);
        let prompt = enhance_prompt(ENHANCE_BULLET_INSTRUCTION, &long, None);
        assert!(!prompt.contains(&long));
        assert!(prompt.contains(&"x".repeat(MAX_FRAGMENT_CHARS)));
    }

    #[test]
    fn test_ats_prompt_without_jd_has_no_jd_section() {
        let prompt = ats_prompt("cv text", None);
        assert!(!prompt.contains("JOB DESCRIPTION"));
        assert!(!prompt.contains("{jd}"));
    }

    #[test]
    fn test_ats_prompt_with_jd() {
        let prompt = ats_prompt("cv text", Some("Rust engineer"));
        assert!(prompt.contains("for the job description that follows it"));
        assert!(prompt.contains("JOB DESCRIPTION:\nRust engineer"));
    }
}
