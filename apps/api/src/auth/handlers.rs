use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::extractor::AuthUser;
use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::auth::policy::{check_registration, normalize_email};
use crate::auth::users::{find_by_email, find_by_id, insert_user};
use crate::cv::versioning::count_cvs;
use crate::errors::AppError;
use crate::models::usage::TokenUsageRow;
use crate::models::user::UserProfile;
use crate::plans::quota::{recent_token_usage, usage_snapshot, UsageSnapshot};
use crate::plans::PlanLimits;
use crate::state::AppState;

const RECENT_USAGE_ROWS: i64 = 20;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
    pub limits: PlanLimits,
    pub usage: UsageSnapshot,
    pub cv_count: i64,
    pub recent_token_usage: Vec<TokenUsageRow>,
}

fn auth_response(state: &AppState, user: UserProfile) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        access_token: state.jwt.issue(user.id, &user.email)?,
        token_type: "Bearer",
        expires_in: state.jwt.expiry_secs(),
        user,
    })
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let registration = check_registration(&req.email, &req.password, &req.name)?;
    state.auth_limiter.check(&registration.email).await?;

    let hash = hash_password(req.password).await?;
    let user = insert_user(&state.db, &registration.email, &hash, &registration.name).await?;
    let profile = UserProfile::from_row(&user, Utc::now());
    Ok((StatusCode::CREATED, Json(auth_response(&state, profile)?)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&req.email).map_err(|_| AppError::InvalidCredentials)?;
    state.auth_limiter.check(&email).await?;

    let Some(user) = find_by_email(&state.db, &email).await? else {
        verify_against_dummy(req.password).await?;
        warn!("Login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(req.password, user.password_hash.clone()).await? {
        warn!("Failed login for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    info!("User {} logged in", user.id);
    let profile = UserProfile::from_row(&user, Utc::now());
    Ok(Json(auth_response(&state, profile)?))
}

/// GET /api/v1/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let now = Utc::now();
    let user = find_by_id(&state.db, auth.id).await?;
    let limits = user.effective_plan(now).limits();

    let usage = usage_snapshot(&state.db, user.id, &limits, now).await?;
    let cv_count = count_cvs(&state.db, user.id).await?;
    let recent = recent_token_usage(&state.db, user.id, RECENT_USAGE_ROWS).await?;

    Ok(Json(MeResponse {
        user: UserProfile::from_row(&user, now),
        limits,
        usage,
        cv_count,
        recent_token_usage: recent,
    }))
}
