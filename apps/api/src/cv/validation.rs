//! Schema validation for CV documents.
//!
//! Collects every failure instead of stopping at the first, so the editor can
//! highlight all offending fields at once. Field names are JSON paths into the
//! document (`experience[2].start_date`).

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use email_address::EmailAddress;
use regex::Regex;
use url::Url;

use crate::cv::data::CvData;
use crate::errors::{AppError, FieldError};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_SHORT_TEXT: usize = 200;
pub const MAX_LONG_TEXT: usize = 5_000;
pub const MAX_ENTRIES_PER_SECTION: usize = 50;
pub const MAX_HIGHLIGHTS: usize = 20;
pub const MAX_CUSTOM_SECTIONS: usize = 10;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^[+0-9().\- ]{5,25}$").expect("static phone regex"))
}

fn date_shape_regex() -> &'static Regex {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    DATE_SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}(-\d{2})?$").expect("static date regex"))
}

/// Validates title and document together. Returns `InvalidDocument` listing every problem.
pub fn ensure_valid(title: &str, data: &CvData) -> Result<(), AppError> {
    let mut errors = validate_title(title);
    errors.extend(validate_document(data));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidDocument(errors))
    }
}

pub fn validate_title(title: &str) -> Vec<FieldError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        vec![FieldError::new("title", "Title is required")]
    } else if trimmed.chars().count() > MAX_TITLE_LEN {
        vec![FieldError::new(
            "title",
            format!("Title must be at most {MAX_TITLE_LEN} characters"),
        )]
    } else {
        Vec::new()
    }
}

pub fn validate_document(data: &CvData) -> Vec<FieldError> {
    let mut v = Validator::default();

    let p = &data.personal;
    v.text("personal.full_name", &p.full_name, MAX_SHORT_TEXT);
    v.text("personal.headline", &p.headline, MAX_SHORT_TEXT);
    v.email("personal.email", &p.email);
    v.phone("personal.phone", &p.phone);
    v.text("personal.location", &p.location, MAX_SHORT_TEXT);
    v.url("personal.website", &p.website);
    v.url("personal.linkedin", &p.linkedin);
    v.url("personal.github", &p.github);
    v.text("personal.summary", &p.summary, MAX_LONG_TEXT);

    v.list_len("experience", data.experience.len(), MAX_ENTRIES_PER_SECTION);
    for (i, e) in data.experience.iter().enumerate() {
        let at = format!("experience[{i}]");
        v.required(&format!("{at}.company"), &e.company, MAX_SHORT_TEXT);
        v.text(&format!("{at}.position"), &e.position, MAX_SHORT_TEXT);
        v.text(&format!("{at}.location"), &e.location, MAX_SHORT_TEXT);
        v.date_range(&at, e.start_date.as_deref(), e.end_date.as_deref(), e.current);
        v.text(&format!("{at}.description"), &e.description, MAX_LONG_TEXT);
        v.highlights(&at, &e.highlights);
    }

    v.list_len("education", data.education.len(), MAX_ENTRIES_PER_SECTION);
    for (i, e) in data.education.iter().enumerate() {
        let at = format!("education[{i}]");
        v.required(&format!("{at}.institution"), &e.institution, MAX_SHORT_TEXT);
        v.text(&format!("{at}.degree"), &e.degree, MAX_SHORT_TEXT);
        v.text(&format!("{at}.field_of_study"), &e.field_of_study, MAX_SHORT_TEXT);
        v.text(&format!("{at}.location"), &e.location, MAX_SHORT_TEXT);
        v.text(&format!("{at}.grade"), &e.grade, MAX_SHORT_TEXT);
        v.date_range(&at, e.start_date.as_deref(), e.end_date.as_deref(), e.current);
        v.text(&format!("{at}.description"), &e.description, MAX_LONG_TEXT);
    }

    v.list_len("skills", data.skills.len(), MAX_ENTRIES_PER_SECTION);
    for (i, s) in data.skills.iter().enumerate() {
        v.required(&format!("skills[{i}].name"), &s.name, MAX_SHORT_TEXT);
        v.text(&format!("skills[{i}].category"), &s.category, MAX_SHORT_TEXT);
    }

    v.list_len("projects", data.projects.len(), MAX_ENTRIES_PER_SECTION);
    for (i, p) in data.projects.iter().enumerate() {
        let at = format!("projects[{i}]");
        v.required(&format!("{at}.name"), &p.name, MAX_SHORT_TEXT);
        v.text(&format!("{at}.role"), &p.role, MAX_SHORT_TEXT);
        v.url(&format!("{at}.url"), &p.url);
        v.date_range(&at, p.start_date.as_deref(), p.end_date.as_deref(), false);
        v.text(&format!("{at}.description"), &p.description, MAX_LONG_TEXT);
        v.list_len(&format!("{at}.technologies"), p.technologies.len(), MAX_HIGHLIGHTS);
        for (j, tech) in p.technologies.iter().enumerate() {
            v.text(&format!("{at}.technologies[{j}]"), tech, MAX_SHORT_TEXT);
        }
        v.highlights(&at, &p.highlights);
    }

    v.list_len("certifications", data.certifications.len(), MAX_ENTRIES_PER_SECTION);
    for (i, c) in data.certifications.iter().enumerate() {
        let at = format!("certifications[{i}]");
        v.required(&format!("{at}.name"), &c.name, MAX_SHORT_TEXT);
        v.text(&format!("{at}.issuer"), &c.issuer, MAX_SHORT_TEXT);
        v.text(&format!("{at}.credential_id"), &c.credential_id, MAX_SHORT_TEXT);
        v.url(&format!("{at}.url"), &c.url);
        v.dates_ordered(
            &format!("{at}.issue_date"),
            c.issue_date.as_deref(),
            &format!("{at}.expiry_date"),
            c.expiry_date.as_deref(),
        );
    }

    v.list_len("languages", data.languages.len(), MAX_ENTRIES_PER_SECTION);
    for (i, l) in data.languages.iter().enumerate() {
        v.required(&format!("languages[{i}].language"), &l.language, MAX_SHORT_TEXT);
    }

    v.list_len("awards", data.awards.len(), MAX_ENTRIES_PER_SECTION);
    for (i, a) in data.awards.iter().enumerate() {
        let at = format!("awards[{i}]");
        v.required(&format!("{at}.title"), &a.title, MAX_SHORT_TEXT);
        v.text(&format!("{at}.issuer"), &a.issuer, MAX_SHORT_TEXT);
        v.date(&format!("{at}.date"), a.date.as_deref());
        v.text(&format!("{at}.description"), &a.description, MAX_LONG_TEXT);
    }

    v.list_len("publications", data.publications.len(), MAX_ENTRIES_PER_SECTION);
    for (i, p) in data.publications.iter().enumerate() {
        let at = format!("publications[{i}]");
        v.required(&format!("{at}.title"), &p.title, MAX_SHORT_TEXT);
        v.text(&format!("{at}.publisher"), &p.publisher, MAX_SHORT_TEXT);
        v.date(&format!("{at}.date"), p.date.as_deref());
        v.url(&format!("{at}.url"), &p.url);
        v.text(&format!("{at}.description"), &p.description, MAX_LONG_TEXT);
    }

    v.list_len("volunteer", data.volunteer.len(), MAX_ENTRIES_PER_SECTION);
    for (i, e) in data.volunteer.iter().enumerate() {
        let at = format!("volunteer[{i}]");
        v.required(&format!("{at}.organization"), &e.organization, MAX_SHORT_TEXT);
        v.text(&format!("{at}.role"), &e.role, MAX_SHORT_TEXT);
        v.date_range(&at, e.start_date.as_deref(), e.end_date.as_deref(), e.current);
        v.text(&format!("{at}.description"), &e.description, MAX_LONG_TEXT);
    }

    v.list_len("custom_sections", data.custom_sections.len(), MAX_CUSTOM_SECTIONS);
    for (i, s) in data.custom_sections.iter().enumerate() {
        let at = format!("custom_sections[{i}]");
        v.required(&format!("{at}.title"), &s.title, MAX_SHORT_TEXT);
        v.list_len(&format!("{at}.items"), s.items.len(), MAX_ENTRIES_PER_SECTION);
        for (j, item) in s.items.iter().enumerate() {
            let item_at = format!("{at}.items[{j}]");
            v.text(&format!("{item_at}.title"), &item.title, MAX_SHORT_TEXT);
            v.text(&format!("{item_at}.subtitle"), &item.subtitle, MAX_SHORT_TEXT);
            v.date(&format!("{item_at}.date"), item.date.as_deref());
            v.text(&format!("{item_at}.description"), &item.description, MAX_LONG_TEXT);
        }
    }

    let mut seen = HashSet::new();
    for (path, id) in data.entry_ids() {
        if !id.is_nil() && !seen.insert(id) {
            v.push(path, "Duplicate entry id");
        }
    }

    v.errors
}

/// Parses `YYYY-MM-DD` or `YYYY-MM` (taken as the first of the month).
pub fn parse_partial_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !date_shape_regex().is_match(raw) {
        return None;
    }
    if raw.len() == 7 {
        NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Default)]
struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn text(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("Must be at most {max} characters"));
        }
    }

    fn required(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.push(field, "This field is required");
        } else {
            self.text(field, value, max);
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() && !EmailAddress::is_valid(value) {
            self.push(field, "Must be a valid email address");
        }
    }

    fn phone(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() && !phone_regex().is_match(value) {
            self.push(field, "Must be a valid phone number");
        }
    }

    /// Absolute http(s) URLs only. Bare hosts such as `github.com/ada` are rejected.
    fn url(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if value.chars().count() > MAX_SHORT_TEXT {
            self.push(field, format!("Must be at most {MAX_SHORT_TEXT} characters"));
            return;
        }
        let valid = Url::parse(value)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| h.contains('.')))
            .unwrap_or(false);
        if !valid {
            self.push(field, "Must be a valid http(s) URL");
        }
    }

    fn date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let raw = present(value)?;
        let parsed = parse_partial_date(raw);
        if parsed.is_none() {
            self.push(field, "Must be a date formatted YYYY-MM or YYYY-MM-DD");
        }
        parsed
    }

    fn dates_ordered(
        &mut self,
        start_field: &str,
        start: Option<&str>,
        end_field: &str,
        end: Option<&str>,
    ) {
        let start = self.date(start_field, start);
        let end = self.date(end_field, end);
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                self.push(end_field, "Must not be before the start date");
            }
        }
    }

    fn date_range(&mut self, at: &str, start: Option<&str>, end: Option<&str>, current: bool) {
        let end_field = format!("{at}.end_date");
        if current && present(end).is_some() {
            self.push(end_field.clone(), "A current position cannot have an end date");
        }
        self.dates_ordered(&format!("{at}.start_date"), start, &end_field, end);
    }

    fn highlights(&mut self, at: &str, highlights: &[String]) {
        self.list_len(&format!("{at}.highlights"), highlights.len(), MAX_HIGHLIGHTS);
        for (j, h) in highlights.iter().enumerate() {
            self.text(&format!("{at}.highlights[{j}]"), h, MAX_LONG_TEXT);
        }
    }

    fn list_len(&mut self, field: &str, len: usize, max: usize) {
        if len > max {
            self.push(field, format!("At most {max} entries allowed"));
        }
    }
}
