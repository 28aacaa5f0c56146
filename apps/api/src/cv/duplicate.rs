//! Copying a CV into a new, private, independent document.

use uuid::Uuid;

use crate::cv::data::CvData;
use crate::cv::validation::MAX_TITLE_LEN;
use crate::models::cv::CvRow;

const COPY_SUFFIX: &str = " (Copy)";

/// A CV about to be inserted. Always private, never shared, version 1.
#[derive(Debug, Clone)]
pub struct NewCv {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub template_id: String,
    pub data: CvData,
}

/// Copies `source` into a new, independent CV owned by `owner`.
pub fn duplicate(source: &CvRow, owner: Uuid) -> NewCv {
    NewCv {
        id: Uuid::new_v4(),
        user_id: owner,
        title: copy_title(&source.title),
        template_id: source.template_id.clone(),
        data: source.data.0.with_fresh_ids(),
    }
}

fn copy_title(title: &str) -> String {
    let budget = MAX_TITLE_LEN - COPY_SUFFIX.chars().count();
    let base: String = title.trim().chars().take(budget).collect();
    format!("{}{COPY_SUFFIX}", base.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::data::SkillEntry;
    use chrono::Utc;
    use sqlx::types::Json;

    fn source() -> CvRow {
        CvRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Backend CV".to_string(),
            template_id: "technical".to_string(),
            data: Json(CvData {
                skills: vec![SkillEntry {
                    id: Uuid::new_v4(),
                    name: "Rust".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            is_public: true,
            share_token: Some("tok".to_string()),
            version: 9,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_copy_gets_new_identity_and_title() {
        let src = source();
        let copy = duplicate(&src, src.user_id);
        assert_ne!(copy.id, src.id);
        assert_eq!(copy.title, "Backend CV (Copy)");
        assert_eq!(copy.template_id, "technical");
    }

    #[test]
    fn test_copy_data_is_independent_of_source() {
        let src = source();
        let mut copy = duplicate(&src, src.user_id);
        assert_ne!(copy.data.skills[0].id, src.data.skills[0].id);

        copy.data.skills[0].name = "Go".to_string();
        assert_eq!(src.data.skills[0].name, "Rust");
    }

    #[test]
    fn test_copy_title_fits_limit() {
        let title = copy_title(&"a".repeat(MAX_TITLE_LEN));
        assert_eq!(title.chars().count(), MAX_TITLE_LEN);
        assert!(title.ends_with(COPY_SUFFIX));
    }
}
