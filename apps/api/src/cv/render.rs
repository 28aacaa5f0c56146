//! Markdown and plain-text export of a CV document.
//!
//! The same rendering feeds LLM prompts and the keyword ATS corpus, so
//! output is stable and contains no markup beyond what the format needs.

use serde::Deserialize;

use crate::cv::data::{CvData, Section};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

struct Item {
    heading: String,
    meta: Vec<String>,
    body: String,
    bullets: Vec<String>,
}

struct Block {
    title: String,
    items: Vec<Item>,
}

fn date_range(start: Option<&str>, end: Option<&str>, current: bool) -> Option<String> {
    let start = start.filter(|s| !s.is_empty());
    let end = if current {
        Some("Present")
    } else {
        end.filter(|s| !s.is_empty())
    };
    match (start, end) {
        (Some(s), Some(e)) => Some(format!("{s} to {e}")),
        (Some(s), None) => Some(s.to_string()),
        (None, Some(e)) => Some(e.to_string()),
        (None, None) => None,
    }
}

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

fn push_meta(meta: &mut Vec<String>, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        meta.push(v);
    }
}

fn blocks(data: &CvData) -> Vec<Block> {
    let mut out = Vec::new();

    let mut push = |section: Section, items: Vec<Item>| {
        if !items.is_empty() {
            out.push(Block {
                title: section.title().to_string(),
                items,
            });
        }
    };

    push(
        Section::Experience,
        data.experience
            .iter()
            .map(|e| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(e.location.clone()));
                push_meta(
                    &mut meta,
                    date_range(e.start_date.as_deref(), e.end_date.as_deref(), e.current),
                );
                Item {
                    heading: join_non_empty(&[&e.position, &e.company], ", "),
                    meta,
                    body: e.description.clone(),
                    bullets: e.highlights.clone(),
                }
            })
            .collect(),
    );

    push(
        Section::Education,
        data.education
            .iter()
            .map(|e| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(e.location.clone()));
                push_meta(
                    &mut meta,
                    date_range(e.start_date.as_deref(), e.end_date.as_deref(), e.current),
                );
                push_meta(&mut meta, Some(e.grade.clone()));
                let degree = join_non_empty(&[&e.degree, &e.field_of_study], " in ");
                Item {
                    heading: join_non_empty(&[&degree, &e.institution], ", "),
                    meta,
                    body: e.description.clone(),
                    bullets: vec![],
                }
            })
            .collect(),
    );

    if !data.skills.is_empty() {
        let mut categories: Vec<(&str, Vec<&str>)> = Vec::new();
        for skill in &data.skills {
            let category = skill.category.trim();
            match categories.iter_mut().find(|(c, _)| *c == category) {
                Some((_, names)) => names.push(skill.name.as_str()),
                None => categories.push((category, vec![skill.name.as_str()])),
            }
        }
        push(
            Section::Skills,
            categories
                .into_iter()
                .map(|(category, names)| Item {
                    heading: String::new(),
                    meta: vec![],
                    body: if category.is_empty() {
                        names.join(", ")
                    } else {
                        format!("{category}: {}", names.join(", "))
                    },
                    bullets: vec![],
                })
                .collect(),
        );
    }

    push(
        Section::Projects,
        data.projects
            .iter()
            .map(|p| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(p.role.clone()));
                push_meta(
                    &mut meta,
                    date_range(p.start_date.as_deref(), p.end_date.as_deref(), false),
                );
                push_meta(&mut meta, Some(p.url.clone()));
                if !p.technologies.is_empty() {
                    meta.push(p.technologies.join(", "));
                }
                Item {
                    heading: p.name.clone(),
                    meta,
                    body: p.description.clone(),
                    bullets: p.highlights.clone(),
                }
            })
            .collect(),
    );

    push(
        Section::Certifications,
        data.certifications
            .iter()
            .map(|c| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(c.issuer.clone()));
                push_meta(&mut meta, c.issue_date.clone());
                push_meta(&mut meta, Some(c.url.clone()));
                Item {
                    heading: c.name.clone(),
                    meta,
                    body: String::new(),
                    bullets: vec![],
                }
            })
            .collect(),
    );

    if !data.languages.is_empty() {
        let line = data
            .languages
            .iter()
            .map(|l| match &l.proficiency {
                Some(p) => format!("{} ({})", l.language, p.label()),
                None => l.language.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        push(
            Section::Languages,
            vec![Item {
                heading: String::new(),
                meta: vec![],
                body: line,
                bullets: vec![],
            }],
        );
    }

    push(
        Section::Awards,
        data.awards
            .iter()
            .map(|a| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(a.issuer.clone()));
                push_meta(&mut meta, a.date.clone());
                Item {
                    heading: a.title.clone(),
                    meta,
                    body: a.description.clone(),
                    bullets: vec![],
                }
            })
            .collect(),
    );

    push(
        Section::Publications,
        data.publications
            .iter()
            .map(|p| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(p.publisher.clone()));
                push_meta(&mut meta, p.date.clone());
                push_meta(&mut meta, Some(p.url.clone()));
                Item {
                    heading: p.title.clone(),
                    meta,
                    body: p.description.clone(),
                    bullets: vec![],
                }
            })
            .collect(),
    );

    push(
        Section::Volunteer,
        data.volunteer
            .iter()
            .map(|v| {
                let mut meta = Vec::new();
                push_meta(
                    &mut meta,
                    date_range(v.start_date.as_deref(), v.end_date.as_deref(), v.current),
                );
                Item {
                    heading: join_non_empty(&[&v.role, &v.organization], ", "),
                    meta,
                    body: v.description.clone(),
                    bullets: vec![],
                }
            })
            .collect(),
    );

    for custom in &data.custom_sections {
        let items: Vec<Item> = custom
            .items
            .iter()
            .map(|i| {
                let mut meta = Vec::new();
                push_meta(&mut meta, Some(i.subtitle.clone()));
                push_meta(&mut meta, i.date.clone());
                Item {
                    heading: i.title.clone(),
                    meta,
                    body: i.description.clone(),
                    bullets: vec![],
                }
            })
            .collect();
        if !items.is_empty() {
            out.push(Block {
                title: custom.title.clone(),
                items,
            });
        }
    }

    out
}

fn contact_line(data: &CvData) -> String {
    let p = &data.personal;
    join_non_empty(
        &[&p.email, &p.phone, &p.location, &p.website, &p.linkedin, &p.github],
        " | ",
    )
}

pub fn render_markdown(title: &str, data: &CvData) -> String {
    let p = &data.personal;
    let name = if p.full_name.trim().is_empty() {
        title
    } else {
        p.full_name.as_str()
    };
    let mut md = format!("# {name}\n\n");
    if !p.headline.trim().is_empty() {
        md.push_str(&format!("**{}**\n\n", p.headline.trim()));
    }
    let contact = contact_line(data);
    if !contact.is_empty() {
        md.push_str(&format!("{contact}\n\n"));
    }
    if !p.summary.trim().is_empty() {
        md.push_str(&format!("## Summary\n\n{}\n\n", p.summary.trim()));
    }

    for block in blocks(data) {
        md.push_str(&format!("## {}\n\n", block.title));
        for item in block.items {
            if !item.heading.is_empty() {
                md.push_str(&format!("### {}\n", item.heading));
            }
            if !item.meta.is_empty() {
                md.push_str(&format!("*{}*\n", item.meta.join(" | ")));
            }
            if !item.body.trim().is_empty() {
                if !item.heading.is_empty() || !item.meta.is_empty() {
                    md.push('\n');
                }
                md.push_str(item.body.trim());
                md.push('\n');
            }
            for bullet in item.bullets.iter().filter(|b| !b.trim().is_empty()) {
                md.push_str(&format!("- {}\n", bullet.trim()));
            }
            md.push('\n');
        }
    }
    md.trim_end().to_string() + "\n"
}

pub fn render_text(data: &CvData) -> String {
    let p = &data.personal;
    let mut lines: Vec<String> = Vec::new();
    for header in [&p.full_name, &p.headline] {
        if !header.trim().is_empty() {
            lines.push(header.trim().to_string());
        }
    }
    let contact = contact_line(data);
    if !contact.is_empty() {
        lines.push(contact);
    }
    if !p.summary.trim().is_empty() {
        lines.push(String::new());
        lines.push("SUMMARY".to_string());
        lines.push(p.summary.trim().to_string());
    }

    for block in blocks(data) {
        lines.push(String::new());
        lines.push(block.title.to_uppercase());
        for item in block.items {
            let mut head = item.heading;
            if !item.meta.is_empty() {
                if !head.is_empty() {
                    head.push_str(" | ");
                }
                head.push_str(&item.meta.join(" | "));
            }
            if !head.is_empty() {
                lines.push(head);
            }
            if !item.body.trim().is_empty() {
                lines.push(item.body.trim().to_string());
            }
            for bullet in item.bullets.iter().filter(|b| !b.trim().is_empty()) {
                lines.push(format!("* {}", bullet.trim()));
            }
        }
    }
    lines.join("\n").trim().to_string() + "\n"
}

/// Safe attachment filename derived from the CV title.
pub fn export_filename(title: &str, format: ExportFormat) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "cv".to_string() } else { slug };
    format!("{slug}.{}", format.extension())
}
