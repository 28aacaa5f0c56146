//! Structural merge of partial CV updates (autosave) and full replacement (manual save).
//!
//! Both paths produce the next version of a CV in memory; persistence is
//! conditional on the version read, see `versioning::update_cv`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cv::data::CvData;
use crate::cv::templates;
use crate::cv::validation::ensure_valid;
use crate::errors::AppError;
use crate::models::cv::CvRow;
use crate::plans::PlanLimits;

/// Partial update body for `PATCH /api/v1/cvs/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CvUpdate {
    pub title: Option<String>,
    pub template_id: Option<String>,
    /// Merge patch applied to the stored document.
    pub data: Option<Value>,
    /// When set, the update is rejected unless the stored version still matches.
    pub expected_version: Option<i32>,
}

/// Full replacement body for `PUT /api/v1/cvs/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct CvReplace {
    pub title: String,
    pub template_id: String,
    pub data: CvData,
    pub expected_version: Option<i32>,
}

/// The next state of a CV, validated and ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCv {
    pub title: String,
    pub template_id: String,
    pub data: CvData,
    /// The version the change was computed from.
    pub base_version: i32,
    pub version: i32,
}

/// RFC 7386 JSON merge patch: objects merge recursively, `null` deletes a key,
/// everything else (arrays included) replaces the target wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

pub fn apply_update(
    current: &CvRow,
    update: &CvUpdate,
    limits: &PlanLimits,
) -> Result<MergedCv, AppError> {
    check_version(current, update.expected_version)?;

    let title = update
        .title
        .as_deref()
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| current.title.clone());
    let template_id = resolve_template(current, update.template_id.as_deref(), limits)?;

    let data = match &update.data {
        Some(patch) => {
            let mut document = serde_json::to_value(&current.data.0)
                .map_err(|e| AppError::Internal(e.into()))?;
            merge_patch(&mut document, patch);
            decode_document(document)?
        }
        None => current.data.0.clone(),
    };

    finish(current, title, template_id, data)
}

pub fn apply_replace(
    current: &CvRow,
    replace: CvReplace,
    limits: &PlanLimits,
) -> Result<MergedCv, AppError> {
    check_version(current, replace.expected_version)?;
    let template_id = resolve_template(current, Some(&replace.template_id), limits)?;
    finish(
        current,
        replace.title.trim().to_string(),
        template_id,
        replace.data,
    )
}

fn finish(
    current: &CvRow,
    title: String,
    template_id: String,
    mut data: CvData,
) -> Result<MergedCv, AppError> {
    data.assign_missing_ids();
    ensure_valid(&title, &data)?;
    Ok(MergedCv {
        title,
        template_id,
        data,
        base_version: current.version,
        version: current.version + 1,
    })
}

fn check_version(current: &CvRow, expected: Option<i32>) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current.version => Err(AppError::Conflict(format!(
            "CV was modified elsewhere (expected version {expected}, found {})",
            current.version
        ))),
        _ => Ok(()),
    }
}

/// Plan rules only apply when the template actually changes, so a downgraded
/// user can keep editing a CV that already uses a premium template.
fn resolve_template(
    current: &CvRow,
    requested: Option<&str>,
    limits: &PlanLimits,
) -> Result<String, AppError> {
    match requested {
        Some(id) if id != current.template_id => {
            templates::ensure_allowed(id, limits)?;
            Ok(id.to_string())
        }
        _ => Ok(current.template_id.clone()),
    }
}

fn decode_document(document: Value) -> Result<CvData, AppError> {
    serde_json::from_value(document)
        .map_err(|e| AppError::Validation(format!("Malformed CV data: {e}")))
}
