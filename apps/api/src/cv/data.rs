//! The CV document stored in `cvs.data`.
//!
//! Every field defaults on decode so partial documents (autosave drafts, fresh
//! blanks) round-trip without error. Validation is a separate pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Personal,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    Languages,
    Awards,
    Publications,
    Volunteer,
    CustomSections,
}

impl Section {
    pub const LISTS: [Section; 10] = [
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Projects,
        Section::Certifications,
        Section::Languages,
        Section::Awards,
        Section::Publications,
        Section::Volunteer,
        Section::CustomSections,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Personal => "personal",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Skills => "skills",
            Section::Projects => "projects",
            Section::Certifications => "certifications",
            Section::Languages => "languages",
            Section::Awards => "awards",
            Section::Publications => "publications",
            Section::Volunteer => "volunteer",
            Section::CustomSections => "custom_sections",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Personal => "Personal Information",
            Section::Experience => "Work Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Projects => "Projects",
            Section::Certifications => "Certifications",
            Section::Languages => "Languages",
            Section::Awards => "Awards",
            Section::Publications => "Publications",
            Section::Volunteer => "Volunteer",
            Section::CustomSections => "Additional Sections",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(Section::Personal)
            .chain(Section::LISTS)
            .find(|section| section.as_str() == s)
            .ok_or_else(|| format!("unknown section '{s}'"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvData {
    pub personal: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub languages: Vec<LanguageEntry>,
    pub awards: Vec<AwardEntry>,
    pub publications: Vec<PublicationEntry>,
    pub volunteer: Vec<VolunteerEntry>,
    pub custom_sections: Vec<CustomSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub headline: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub website: String,
    pub linkedin: String,
    pub github: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub location: String,
    /// `YYYY-MM` or `YYYY-MM-DD`.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub id: Uuid,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub location: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub grade: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntry {
    pub id: Uuid,
    pub name: String,
    pub level: Option<SkillLevel>,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub url: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: String,
    pub technologies: Vec<String>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationEntry {
    pub id: Uuid,
    pub name: String,
    pub issuer: String,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageProficiency {
    Elementary,
    Limited,
    Professional,
    Fluent,
    Native,
}

impl LanguageProficiency {
    pub fn label(&self) -> &'static str {
        match self {
            LanguageProficiency::Elementary => "Elementary",
            LanguageProficiency::Limited => "Limited working",
            LanguageProficiency::Professional => "Professional working",
            LanguageProficiency::Fluent => "Fluent",
            LanguageProficiency::Native => "Native",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageEntry {
    pub id: Uuid,
    pub language: String,
    pub proficiency: Option<LanguageProficiency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardEntry {
    pub id: Uuid,
    pub title: String,
    pub issuer: String,
    pub date: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationEntry {
    pub id: Uuid,
    pub title: String,
    pub publisher: String,
    pub date: Option<String>,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolunteerEntry {
    pub id: Uuid,
    pub organization: String,
    pub role: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSection {
    pub id: Uuid,
    pub title: String,
    pub items: Vec<CustomItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomItem {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub date: Option<String>,
    pub description: String,
}

impl CvData {
    /// Deep copy with every entry id regenerated. The copy shares nothing with `self`.
    pub fn with_fresh_ids(&self) -> CvData {
        let mut copy = self.clone();
        copy.experience.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.education.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.skills.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.projects.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.certifications.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.languages.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.awards.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.publications.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        copy.volunteer.iter_mut().for_each(|e| e.id = Uuid::new_v4());
        for section in &mut copy.custom_sections {
            section.id = Uuid::new_v4();
            section.items.iter_mut().for_each(|i| i.id = Uuid::new_v4());
        }
        copy
    }

    /// Gives every entry that arrived without an id (nil) a fresh one.
    pub fn assign_missing_ids(&mut self) {
        fn fill(id: &mut Uuid) {
            if id.is_nil() {
                *id = Uuid::new_v4();
            }
        }
        self.experience.iter_mut().for_each(|e| fill(&mut e.id));
        self.education.iter_mut().for_each(|e| fill(&mut e.id));
        self.skills.iter_mut().for_each(|e| fill(&mut e.id));
        self.projects.iter_mut().for_each(|e| fill(&mut e.id));
        self.certifications.iter_mut().for_each(|e| fill(&mut e.id));
        self.languages.iter_mut().for_each(|e| fill(&mut e.id));
        self.awards.iter_mut().for_each(|e| fill(&mut e.id));
        self.publications.iter_mut().for_each(|e| fill(&mut e.id));
        self.volunteer.iter_mut().for_each(|e| fill(&mut e.id));
        for section in &mut self.custom_sections {
            fill(&mut section.id);
            section.items.iter_mut().for_each(|i| fill(&mut i.id));
        }
    }

    pub fn section_len(&self, section: Section) -> usize {
        match section {
            Section::Personal => usize::from(self.personal != PersonalInfo::default()),
            Section::Experience => self.experience.len(),
            Section::Education => self.education.len(),
            Section::Skills => self.skills.len(),
            Section::Projects => self.projects.len(),
            Section::Certifications => self.certifications.len(),
            Section::Languages => self.languages.len(),
            Section::Awards => self.awards.len(),
            Section::Publications => self.publications.len(),
            Section::Volunteer => self.volunteer.len(),
            Section::CustomSections => self.custom_sections.len(),
        }
    }

    /// Entry counts for every list section, in display order.
    pub fn section_counts(&self) -> Vec<(Section, usize)> {
        Section::LISTS
            .iter()
            .map(|section| (*section, self.section_len(*section)))
            .collect()
    }

    /// All entry ids in document order, paired with their JSON path.
    pub fn entry_ids(&self) -> Vec<(String, Uuid)> {
        fn indexed<'a, T: 'a>(
            section: &'a str,
            entries: &'a [T],
            id: impl Fn(&T) -> Uuid + 'a,
        ) -> impl Iterator<Item = (String, Uuid)> + 'a {
            entries
                .iter()
                .enumerate()
                .map(move |(i, e)| (format!("{section}[{i}].id"), id(e)))
        }

        let mut ids: Vec<(String, Uuid)> = Vec::new();
        ids.extend(indexed("experience", &self.experience, |e| e.id));
        ids.extend(indexed("education", &self.education, |e| e.id));
        ids.extend(indexed("skills", &self.skills, |e| e.id));
        ids.extend(indexed("projects", &self.projects, |e| e.id));
        ids.extend(indexed("certifications", &self.certifications, |e| e.id));
        ids.extend(indexed("languages", &self.languages, |e| e.id));
        ids.extend(indexed("awards", &self.awards, |e| e.id));
        ids.extend(indexed("publications", &self.publications, |e| e.id));
        ids.extend(indexed("volunteer", &self.volunteer, |e| e.id));
        for (i, section) in self.custom_sections.iter().enumerate() {
            ids.push((format!("custom_sections[{i}].id"), section.id));
            for (j, item) in section.items.iter().enumerate() {
                ids.push((format!("custom_sections[{i}].items[{j}].id"), item.id));
            }
        }
        ids
    }

    /// Experience and project highlights, the bullets an ATS reads most closely.
    pub fn highlights(&self) -> impl Iterator<Item = &str> {
        self.experience
            .iter()
            .flat_map(|e| e.highlights.iter())
            .chain(self.projects.iter().flat_map(|p| p.highlights.iter()))
            .map(String::as_str)
    }
}
