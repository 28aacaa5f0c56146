//! Default-value construction for new CVs and new section entries.

use serde_json::Value;
use uuid::Uuid;

use crate::cv::data::{
    AwardEntry, CertificationEntry, CustomSection, CvData, EducationEntry, ExperienceEntry,
    LanguageEntry, PersonalInfo, ProjectEntry, PublicationEntry, Section, SkillEntry,
    VolunteerEntry,
};
use crate::errors::AppError;
use crate::models::user::UserRow;

pub const DEFAULT_TITLE: &str = "Untitled CV";

/// An empty document prefilled with what we already know about the owner.
pub fn blank_cv(user: &UserRow) -> CvData {
    CvData {
        personal: PersonalInfo {
            full_name: user.name.clone(),
            email: user.email.clone(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A default entry for `section`, carrying a fresh id, ready to append client-side.
pub fn new_entry(section: Section) -> Result<Value, AppError> {
    let id = Uuid::new_v4();
    let value = match section {
        Section::Personal => {
            return Err(AppError::Validation(
                "The personal section has no entries".to_string(),
            ))
        }
        Section::Experience => serde_json::to_value(ExperienceEntry {
            id,
            ..Default::default()
        }),
        Section::Education => serde_json::to_value(EducationEntry {
            id,
            ..Default::default()
        }),
        Section::Skills => serde_json::to_value(SkillEntry {
            id,
            ..Default::default()
        }),
        Section::Projects => serde_json::to_value(ProjectEntry {
            id,
            ..Default::default()
        }),
        Section::Certifications => serde_json::to_value(CertificationEntry {
            id,
            ..Default::default()
        }),
        Section::Languages => serde_json::to_value(LanguageEntry {
            id,
            ..Default::default()
        }),
        Section::Awards => serde_json::to_value(AwardEntry {
            id,
            ..Default::default()
        }),
        Section::Publications => serde_json::to_value(PublicationEntry {
            id,
            ..Default::default()
        }),
        Section::Volunteer => serde_json::to_value(VolunteerEntry {
            id,
            ..Default::default()
        }),
        Section::CustomSections => serde_json::to_value(CustomSection {
            id,
            title: "New Section".to_string(),
            items: Vec::new(),
        }),
    };
    value.map_err(|e| AppError::Internal(e.into()))
}
