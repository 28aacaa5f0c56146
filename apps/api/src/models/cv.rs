use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::cv::data::CvData;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CvRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub template_id: String,
    pub data: Json<CvData>,
    pub is_public: bool,
    pub share_token: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List view of a CV, without the document body.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CvSummaryRow {
    pub id: Uuid,
    pub title: String,
    pub template_id: String,
    pub is_public: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CvVersionRow {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub version: i32,
    pub title: String,
    pub template_id: String,
    pub data: Json<CvData>,
    pub created_at: DateTime<Utc>,
}

/// History list entry: a snapshot without its document body.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CvVersionSummaryRow {
    pub version: i32,
    pub title: String,
    pub template_id: String,
    pub created_at: DateTime<Utc>,
}

/// Publicly shared CV: what an unauthenticated reader with the token may see.
#[derive(Debug, Clone, Serialize)]
pub struct SharedCv {
    pub title: String,
    pub template_id: String,
    pub data: CvData,
    pub updated_at: DateTime<Utc>,
}

impl From<CvRow> for SharedCv {
    fn from(row: CvRow) -> Self {
        Self {
            title: row.title,
            template_id: row.template_id,
            data: row.data.0,
            updated_at: row.updated_at,
        }
    }
}
