//! ATS scoring: a pluggable, trait-based scorer that estimates how well a CV
//! survives an applicant tracking system, optionally against a job description.
//!
//! `KeywordAtsScorer` is deterministic and free on every plan. `LlmAtsScorer`
//! asks the model for a report and is gated by `PlanLimits::ai_ats_scoring`.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::impact::quantified_ratio;
use crate::ai::keywords::{extract_keywords, tokenize};
use crate::ai::prompts::ats_prompt;
use crate::cv::data::CvData;
use crate::cv::render::render_text;
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, TokenUsage};

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub keyword: String,
    /// 1.0 listed as a skill, 0.6 mentioned in the text.
    pub strength: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtsReport {
    /// 0 to 100.
    pub score: u32,
    pub checks: Vec<AtsCheck>,
    pub matched_keywords: Vec<KeywordMatch>,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
    pub scorer_backend: &'static str,
    /// Set when the report cost an LLM call.
    #[serde(skip)]
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait AtsScorer: Send + Sync {
    async fn score(&self, cv: &CvData, job_description: Option<&str>) -> Result<AtsReport, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordAtsScorer
// ────────────────────────────────────────────────────────────────────────────

/// Structure checks plus job-description keyword coverage.
///
/// Without a job description the score is the share of passed checks. With one:
/// `score = 100 × (0.4 × checks + 0.6 × coverage)`, where each JD keyword counts
/// 1.0 when listed as a skill, 0.6 when it appears anywhere in the CV text.
pub struct KeywordAtsScorer;

#[async_trait]
impl AtsScorer for KeywordAtsScorer {
    async fn score(&self, cv: &CvData, job_description: Option<&str>) -> Result<AtsReport, AppError> {
        Ok(keyword_report(cv, job_description))
    }
}

const MIN_SUMMARY_WORDS: usize = 20;
const MIN_SKILLS: usize = 5;
const MAX_MISSING_SUGGESTIONS: usize = 5;

fn check(name: &str, passed: bool, ok: &str, fail: &str) -> AtsCheck {
    AtsCheck {
        name: name.to_string(),
        passed,
        detail: (if passed { ok } else { fail }).to_string(),
    }
}

fn structure_checks(cv: &CvData) -> Vec<AtsCheck> {
    let p = &cv.personal;
    let has_contact = !p.full_name.trim().is_empty()
        && !p.email.trim().is_empty()
        && !p.phone.trim().is_empty();
    let summary_words = p.summary.split_whitespace().count();
    let dated_experience = !cv.experience.is_empty()
        && cv
            .experience
            .iter()
            .all(|e| e.start_date.as_deref().is_some_and(|d| !d.is_empty()));
    let quantified = quantified_ratio(cv.highlights()).unwrap_or(0.0);

    vec![
        check(
            "contact",
            has_contact,
            "Name, email and phone are present",
            "Add your full name, email and phone so recruiters can reach you",
        ),
        check(
            "summary",
            summary_words >= MIN_SUMMARY_WORDS,
            "Summary is substantial",
            "Write a summary of at least 20 words",
        ),
        check(
            "experience",
            dated_experience,
            "Every position has a start date",
            "List your positions with start dates; ATS parsers rank undated roles lower",
        ),
        check(
            "skills",
            cv.skills.len() >= MIN_SKILLS,
            "Skills section is well populated",
            "List at least 5 skills in the skills section",
        ),
        check(
            "quantification",
            quantified >= 0.5,
            "Most highlights state a measurable result",
            "Add numbers to your highlights: percentages, amounts, counts",
        ),
        check(
            "education",
            !cv.education.is_empty(),
            "Education is listed",
            "Add your education",
        ),
    ]
}

fn keyword_report(cv: &CvData, job_description: Option<&str>) -> AtsReport {
    let checks = structure_checks(cv);
    let structure = checks.iter().filter(|c| c.passed).count() as f32 / checks.len() as f32;
    let mut suggestions: Vec<String> = checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.detail.clone())
        .collect();

    let keywords = job_description.map(extract_keywords).unwrap_or_default();
    if keywords.is_empty() {
        return AtsReport {
            score: (structure * 100.0).round() as u32,
            checks,
            matched_keywords: vec![],
            missing_keywords: vec![],
            suggestions,
            scorer_backend: "keyword",
            usage: None,
        };
    }

    let skills: HashSet<String> = cv
        .skills
        .iter()
        .map(|s| s.name.trim().to_lowercase())
        .collect();
    let corpus: HashSet<String> = tokenize(&render_text(cv)).collect();

    let mut matched_keywords = Vec::new();
    let mut missing_keywords = Vec::new();
    let mut total_strength = 0.0_f32;
    for kw in &keywords {
        let strength = if skills.contains(&kw.keyword) {
            1.0
        } else if corpus.contains(&kw.keyword) {
            0.6
        } else {
            0.0
        };
        total_strength += strength;
        if strength > 0.0 {
            matched_keywords.push(KeywordMatch {
                keyword: kw.keyword.clone(),
                strength,
            });
        } else {
            missing_keywords.push(kw.keyword.clone());
        }
    }
    let coverage = total_strength / keywords.len() as f32;

    suggestions.extend(
        missing_keywords
            .iter()
            .take(MAX_MISSING_SUGGESTIONS)
            .map(|k| format!("Mention '{k}' if it reflects your experience")),
    );

    AtsReport {
        score: ((0.4 * structure + 0.6 * coverage) * 100.0).round().clamp(0.0, 100.0) as u32,
        checks,
        matched_keywords,
        missing_keywords,
        suggestions,
        scorer_backend: "keyword",
        usage: None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmAtsScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmAtsScorer {
    llm: LlmClient,
}

impl LlmAtsScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[derive(Debug, Deserialize)]
struct LlmAtsAnswer {
    score: f64,
    #[serde(default)]
    checks: Vec<AtsCheck>,
    #[serde(default)]
    matched_keywords: Vec<String>,
    #[serde(default)]
    missing_keywords: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[async_trait]
impl AtsScorer for LlmAtsScorer {
    async fn score(&self, cv: &CvData, job_description: Option<&str>) -> Result<AtsReport, AppError> {
        let prompt = ats_prompt(&render_text(cv), job_description);
        let output = self
            .llm
            .call_json::<LlmAtsAnswer>(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("ATS scoring failed: {e}")))?;
        Ok(from_llm_answer(output.value, output.usage))
    }
}

fn from_llm_answer(answer: LlmAtsAnswer, usage: TokenUsage) -> AtsReport {
    let score = if answer.score.is_finite() {
        answer.score.round().clamp(0.0, 100.0) as u32
    } else {
        0
    };
    AtsReport {
        score,
        checks: answer.checks,
        matched_keywords: answer
            .matched_keywords
            .into_iter()
            .map(|keyword| KeywordMatch {
                keyword,
                strength: 1.0,
            })
            .collect(),
        missing_keywords: answer.missing_keywords,
        suggestions: answer.suggestions,
        scorer_backend: "llm",
        usage: Some(usage),
    }
}
