use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::ats::AtsReport;
use crate::ai::impact::{check_impact, ImpactCheck};
use crate::ai::prompts::{
    enhance_prompt, summary_prompt, ENHANCE_BULLET_INSTRUCTION, ENHANCE_DESCRIPTION_INSTRUCTION,
    ENHANCE_SUMMARY_INSTRUCTION, MAX_FRAGMENT_CHARS, WRITER_SYSTEM,
};
use crate::auth::extractor::AuthUser;
use crate::auth::users::find_by_id;
use crate::cv::render::render_text;
use crate::cv::versioning::get_cv;
use crate::errors::AppError;
use crate::llm_client::TokenUsage;
use crate::plans::quota::{record_token_usage, release_ai_call, reserve_ai_call, UsageSnapshot};
use crate::plans::PlanLimits;
use crate::state::AppState;

/// A reserved unit of AI quota. Must end in `complete` or `abort`.
struct AiCall {
    user_id: Uuid,
    reserved_at: DateTime<Utc>,
    usage: UsageSnapshot,
}

impl AiCall {
    /// Rate limit, then reserve one call against the caller's plan quota.
    async fn reserve(state: &AppState, auth: &AuthUser) -> Result<Self, AppError> {
        state.ai_limiter.check(&auth.id.to_string()).await?;
        let now = Utc::now();
        let user = find_by_id(&state.db, auth.id).await?;
        let limits = user.effective_plan(now).limits();
        let usage = reserve_ai_call(&state.db, user.id, &limits, now).await?;
        Ok(Self {
            user_id: user.id,
            reserved_at: now,
            usage,
        })
    }

    async fn complete(&self, state: &AppState, feature: &str, usage: &TokenUsage) {
        info!(
            "AI {feature} for user {}: {} prompt + {} completion tokens",
            self.user_id, usage.prompt_tokens, usage.completion_tokens
        );
        if let Err(e) = record_token_usage(&state.db, self.user_id, feature, usage).await {
            warn!("Failed to record token usage for user {}: {e}", self.user_id);
        }
    }

    async fn abort(&self, state: &AppState) {
        if let Err(e) = release_ai_call(&state.db, self.user_id, self.reserved_at).await {
            warn!("Failed to release AI reservation for user {}: {e}", self.user_id);
        }
    }

    fn remaining_today(&self) -> u32 {
        self.usage.remaining_today()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnhanceKind {
    Summary,
    Bullet,
    Description,
}

impl EnhanceKind {
    fn instruction(&self) -> &'static str {
        match self {
            EnhanceKind::Summary => ENHANCE_SUMMARY_INSTRUCTION,
            EnhanceKind::Bullet => ENHANCE_BULLET_INSTRUCTION,
            EnhanceKind::Description => ENHANCE_DESCRIPTION_INSTRUCTION,
        }
    }

    fn feature(&self) -> &'static str {
        match self {
            EnhanceKind::Summary => "enhance_summary",
            EnhanceKind::Bullet => "enhance_bullet",
            EnhanceKind::Description => "enhance_description",
        }
    }
}

#[derive(Deserialize)]
pub struct EnhanceRequest {
    pub text: String,
    pub kind: EnhanceKind,
    /// Role or company the fragment belongs to, for tone.
    pub context: Option<String>,
}

#[derive(Serialize)]
pub struct EnhanceResponse {
    pub kind: EnhanceKind,
    pub original: String,
    pub enhanced: String,
    /// Quantification check of the rewritten bullet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactCheck>,
    pub remaining_today: u32,
}

fn check_fragment(text: &str) -> Result<&str, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Text to enhance is empty".to_string()));
    }
    if text.chars().count() > MAX_FRAGMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Text to enhance must be at most {MAX_FRAGMENT_CHARS} characters"
        )));
    }
    Ok(text)
}

/// POST /api/v1/ai/enhance
pub async fn handle_enhance(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, AppError> {
    let text = check_fragment(&req.text)?;
    let call = AiCall::reserve(&state, &auth).await?;

    let prompt = enhance_prompt(req.kind.instruction(), text, req.context.as_deref());
    let output = match state.llm.call_text(&prompt, WRITER_SYSTEM).await {
        Ok(output) => output,
        Err(e) => {
            call.abort(&state).await;
            return Err(AppError::Llm(format!("Enhancement failed: {e}")));
        }
    };
    call.complete(&state, req.kind.feature(), &output.usage).await;

    let impact = (req.kind == EnhanceKind::Bullet).then(|| check_impact(&output.value));
    Ok(Json(EnhanceResponse {
        kind: req.kind,
        original: text.to_string(),
        enhanced: output.value,
        impact,
        remaining_today: call.remaining_today(),
    }))
}

#[derive(Deserialize)]
pub struct SummaryRequest {
    pub cv_id: Uuid,
    pub target_role: Option<String>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub remaining_today: u32,
}

/// POST /api/v1/ai/summary
pub async fn handle_generate_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let cv = get_cv(&state.db, auth.id, req.cv_id).await?;
    let call = AiCall::reserve(&state, &auth).await?;

    let prompt = summary_prompt(&render_text(&cv.data), req.target_role.as_deref());
    let output = match state.llm.call_text(&prompt, WRITER_SYSTEM).await {
        Ok(output) => output,
        Err(e) => {
            call.abort(&state).await;
            return Err(AppError::Llm(format!("Summary generation failed: {e}")));
        }
    };
    call.complete(&state, "summary", &output.usage).await;

    Ok(Json(SummaryResponse {
        summary: output.value,
        remaining_today: call.remaining_today(),
    }))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AtsMode {
    #[default]
    Keyword,
    Ai,
}

#[derive(Deserialize)]
pub struct AtsRequest {
    pub cv_id: Uuid,
    pub job_description: Option<String>,
    #[serde(default)]
    pub mode: AtsMode,
}

/// Picks the scorer backend: the LLM only when asked for and the plan includes it.
fn resolve_mode(requested: AtsMode, limits: &PlanLimits) -> Result<AtsMode, AppError> {
    match requested {
        AtsMode::Ai if !limits.ai_ats_scoring => Err(AppError::PlanRequired(
            "AI-powered ATS scoring requires a premium plan".to_string(),
        )),
        mode => Ok(mode),
    }
}

/// POST /api/v1/ai/ats-score
pub async fn handle_ats_score(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AtsRequest>,
) -> Result<Json<AtsReport>, AppError> {
    let user = find_by_id(&state.db, auth.id).await?;
    let mode = resolve_mode(req.mode, &user.effective_plan(Utc::now()).limits())?;
    let cv = get_cv(&state.db, auth.id, req.cv_id).await?;
    let job_description = req
        .job_description
        .as_deref()
        .map(str::trim)
        .filter(|jd| !jd.is_empty());

    if mode == AtsMode::Keyword {
        return Ok(Json(state.keyword_ats.score(&cv.data, job_description).await?));
    }

    let call = AiCall::reserve(&state, &auth).await?;
    let report = match state.llm_ats.score(&cv.data, job_description).await {
        Ok(report) => report,
        Err(e) => {
            call.abort(&state).await;
            return Err(e);
        }
    };
    if let Some(usage) = &report.usage {
        call.complete(&state, "ats_score", usage).await;
    }
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::users::insert_user;
    use crate::plans::quota::usage_snapshot;
    use crate::plans::PlanTier;
    use sqlx::PgPool;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_free_plan_cannot_use_ai_ats() {
        let err = resolve_mode(AtsMode::Ai, &PlanTier::Free.limits()).unwrap_err();
        assert!(matches!(err, AppError::PlanRequired(_)));
    }

    #[test]
    fn test_keyword_mode_always_allowed() {
        assert_eq!(
            resolve_mode(AtsMode::Keyword, &PlanTier::Free.limits()).unwrap(),
            AtsMode::Keyword
        );
        assert_eq!(
            resolve_mode(AtsMode::Ai, &PlanTier::Premium.limits()).unwrap(),
            AtsMode::Ai
        );
    }

    #[test]
    fn test_fragment_checks() {
        assert_eq!(check_fragment("  Led a team  ").unwrap(), "Led a team");
        assert!(check_fragment("   ").is_err());
        assert!(check_fragment(&"a".repeat(MAX_FRAGMENT_CHARS + 1)).is_err());
    }

    #[test]
    fn test_enhance_request_decodes_kind() {
        let req: EnhanceRequest =
            serde_json::from_str(r#"{"text": "Did stuff", "kind": "bullet"}"#).unwrap();
        assert_eq!(req.kind, EnhanceKind::Bullet);
        assert!(req.context.is_none());
    }

    #[test]
    fn test_ats_request_defaults_to_keyword() {
        let req: AtsRequest =
            serde_json::from_str(r#"{"cv_id": "7b0f1f7e-3c2a-4c7e-9f5e-2d1a8b6c4e3f"}"#).unwrap();
        assert_eq!(req.mode, AtsMode::Keyword);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_failed_llm_call_releases_quota(pool: PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let user = insert_user(&pool, "ada@example.com", "not-a-hash", "Ada").await.unwrap();
        let state = AppState::for_tests_with(pool.clone(), &server.uri());
        let auth = AuthUser {
            id: user.id,
            email: user.email.clone(),
        };
        let req = EnhanceRequest {
            text: "Led a team".to_string(),
            kind: EnhanceKind::Bullet,
            context: None,
        };

        let Err(err) = handle_enhance(State(state), auth, Json(req)).await else {
            panic!("an LLM failure must surface as an error");
        };
        assert!(matches!(err, AppError::Llm(_)));

        let usage = usage_snapshot(&pool, user.id, &PlanTier::Free.limits(), Utc::now())
            .await
            .unwrap();
        assert_eq!(usage.used_today, 0);
        assert_eq!(usage.used_this_month, 0);
    }
}
