use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::users::find_by_id;
use crate::cv::completeness::{compute_completeness_report, CompletenessReport};
use crate::cv::data::{CvData, Section};
use crate::cv::defaults::{blank_cv, new_entry, DEFAULT_TITLE};
use crate::cv::duplicate::{duplicate, NewCv};
use crate::cv::merge::{apply_replace, apply_update, CvReplace, CvUpdate};
use crate::cv::render::{export_filename, render_markdown, render_text, ExportFormat};
use crate::cv::share::{self, ShareLink, ShareState};
use crate::cv::templates::{self, Template, DEFAULT_TEMPLATE};
use crate::cv::validation::{ensure_valid, validate_document, validate_title};
use crate::cv::versioning::{
    delete_cv, find_shared, get_cv, get_snapshot, insert_cv, issue_share, list_cvs, list_history,
    restored, set_share_state, update_cv, Snapshot,
};
use crate::errors::{AppError, FieldError};
use crate::models::cv::{CvRow, CvSummaryRow, CvVersionSummaryRow, SharedCv};
use crate::plans::PlanLimits;
use crate::state::AppState;

async fn caller_limits(state: &AppState, auth: &AuthUser) -> Result<PlanLimits, AppError> {
    let user = find_by_id(&state.db, auth.id).await?;
    Ok(user.effective_plan(Utc::now()).limits())
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateCvRequest {
    pub title: Option<String>,
    pub template_id: Option<String>,
    pub data: Option<CvData>,
}

/// An empty body asks for a blank CV. Anything else must decode in full.
fn parse_create_body(body: &[u8]) -> Result<CreateCvRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateCvRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

/// GET /api/v1/cvs
pub async fn handle_list_cvs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CvSummaryRow>>, AppError> {
    Ok(Json(list_cvs(&state.db, auth.id).await?))
}

/// POST /api/v1/cvs
pub async fn handle_create_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<CvRow>), AppError> {
    let req = parse_create_body(&body)?;
    let user = find_by_id(&state.db, auth.id).await?;
    let limits = user.effective_plan(Utc::now()).limits();

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let template_id = req
        .template_id
        .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
    templates::ensure_allowed(&template_id, &limits)?;

    let data = match req.data {
        Some(mut data) => {
            data.assign_missing_ids();
            data
        }
        None => blank_cv(&user),
    };
    ensure_valid(&title, &data)?;

    let new_cv = NewCv {
        id: Uuid::new_v4(),
        user_id: user.id,
        title,
        template_id,
        data,
    };
    let row = insert_cv(&state.db, &new_cv, &limits).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/cvs/:id
pub async fn handle_get_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CvRow>, AppError> {
    Ok(Json(get_cv(&state.db, auth.id, id).await?))
}

/// PATCH /api/v1/cvs/:id
pub async fn handle_update_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<CvUpdate>,
) -> Result<Json<CvRow>, AppError> {
    let limits = caller_limits(&state, &auth).await?;
    let current = get_cv(&state.db, auth.id, id).await?;
    let merged = apply_update(&current, &update, &limits)?;
    let row = update_cv(&state.db, auth.id, id, &merged, Snapshot::Skip).await?;
    Ok(Json(row))
}

/// PUT /api/v1/cvs/:id
pub async fn handle_replace_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(replace): Json<CvReplace>,
) -> Result<Json<CvRow>, AppError> {
    let limits = caller_limits(&state, &auth).await?;
    let current = get_cv(&state.db, auth.id, id).await?;
    let merged = apply_replace(&current, replace, &limits)?;
    let row = update_cv(&state.db, auth.id, id, &merged, Snapshot::Record).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/cvs/:id
pub async fn handle_delete_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_cv(&state.db, auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/cvs/:id/duplicate
pub async fn handle_duplicate_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<CvRow>), AppError> {
    let limits = caller_limits(&state, &auth).await?;
    let source = get_cv(&state.db, auth.id, id).await?;
    let copy = duplicate(&source, auth.id);
    let row = insert_cv(&state.db, &copy, &limits).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// POST /api/v1/cvs/:id/share
pub async fn handle_share_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareLink>, AppError> {
    let current = get_cv(&state.db, auth.id, id).await?;
    let next = share::issue(&current);
    let row = issue_share(&state.db, auth.id, id, &next).await?;

    let token = row
        .share_token
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Share token missing after issue")))?;
    Ok(Json(ShareLink {
        share_url: share::share_url(&state.config.app_base_url, &token),
        share_token: token,
        is_public: row.is_public,
    }))
}

/// DELETE /api/v1/cvs/:id/share
pub async fn handle_revoke_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareState>, AppError> {
    let row = set_share_state(&state.db, auth.id, id, &share::revoke()).await?;
    Ok(Json(ShareState {
        is_public: row.is_public,
        share_token: row.share_token,
    }))
}

/// GET /api/v1/shared/:token (public)
pub async fn handle_get_shared(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SharedCv>, AppError> {
    let missing = || AppError::NotFound("Shared CV not found".to_string());
    if !share::looks_like_token(&token) {
        return Err(missing());
    }
    let row = find_shared(&state.db, &token).await?.ok_or_else(missing)?;
    Ok(Json(SharedCv::from(row)))
}

/// GET /api/v1/cvs/:id/history
pub async fn handle_cv_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CvVersionSummaryRow>>, AppError> {
    let cv = get_cv(&state.db, auth.id, id).await?;
    Ok(Json(list_history(&state.db, cv.id).await?))
}

/// POST /api/v1/cvs/:id/restore/:version
pub async fn handle_restore_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, version)): Path<(Uuid, i32)>,
) -> Result<Json<CvRow>, AppError> {
    let current = get_cv(&state.db, auth.id, id).await?;
    let snapshot = get_snapshot(&state.db, current.id, version).await?;
    let next = restored(&current, snapshot);
    let row = update_cv(&state.db, auth.id, id, &next, Snapshot::Record).await?;
    Ok(Json(row))
}

/// GET /api/v1/cvs/:id/completeness
pub async fn handle_cv_completeness(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletenessReport>, AppError> {
    let cv = get_cv(&state.db, auth.id, id).await?;
    Ok(Json(compute_completeness_report(&cv.data)))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// GET /api/v1/cvs/:id/export?format=markdown|text|json
pub async fn handle_export_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let cv = get_cv(&state.db, auth.id, id).await?;
    let body = match query.format {
        ExportFormat::Markdown => render_markdown(&cv.title, &cv.data),
        ExportFormat::Text => render_text(&cv.data),
        ExportFormat::Json => serde_json::to_string_pretty(&SharedCv::from(cv.clone()))
            .map_err(|e| AppError::Internal(e.into()))?,
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(&cv.title, query.format)
    );
    Ok((
        [
            (header::CONTENT_TYPE, query.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub data: CvData,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: Vec<FieldError>,
    pub section_counts: Vec<SectionCount>,
}

#[derive(Serialize)]
pub struct SectionCount {
    pub section: Section,
    pub count: usize,
}

/// POST /api/v1/cvs/validate
pub async fn handle_validate_cv(
    _auth: AuthUser,
    Json(req): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    let mut errors = req.title.as_deref().map(validate_title).unwrap_or_default();
    errors.extend(validate_document(&req.data));
    Json(ValidateResponse {
        valid: errors.is_empty(),
        errors,
        section_counts: req
            .data
            .section_counts()
            .into_iter()
            .map(|(section, count)| SectionCount { section, count })
            .collect(),
    })
}

#[derive(Serialize)]
pub struct TemplateInfo {
    #[serde(flatten)]
    pub template: Template,
    pub available: bool,
}

/// GET /api/v1/cv-templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<TemplateInfo>>, AppError> {
    let limits = caller_limits(&state, &auth).await?;
    Ok(Json(
        templates::TEMPLATES
            .iter()
            .map(|t| TemplateInfo {
                template: *t,
                available: !t.premium || limits.premium_templates,
            })
            .collect(),
    ))
}

/// GET /api/v1/cv-sections/:section/new
pub async fn handle_new_entry(
    _auth: AuthUser,
    Path(section): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let section: Section = section.parse().map_err(AppError::Validation)?;
    Ok(Json(new_entry(section)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_create_body_means_blank_cv() {
        let bodies: [&[u8]; 2] = [b"", b"  \n"];
        for body in bodies {
            let req = parse_create_body(body).unwrap();
            assert!(req.title.is_none());
            assert!(req.data.is_none());
        }
    }

    #[test]
    fn test_create_body_keeps_caller_fields() {
        let req = parse_create_body(br#"{"title": "Senior CV", "template_id": "classic"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("Senior CV"));
        assert_eq!(req.template_id.as_deref(), Some("classic"));
    }

    #[test]
    fn test_malformed_create_body_rejected() {
        let bodies: [&[u8]; 3] = [
            br#"{"data": {"skills": "Rust, Go"}}"#,
            br#"{"title": 42}"#,
            b"not json",
        ];
        for body in bodies {
            let err = parse_create_body(body).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
