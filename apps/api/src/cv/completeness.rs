use serde::{Deserialize, Serialize};

use crate::ai::impact::quantified_ratio;
use crate::cv::data::{CvData, Section};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Strong,
    Moderate,
    Weak,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionHealth {
    pub section: Section,
    pub score: f64,
    pub entry_count: usize,
    pub status: SectionStatus,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub overall_score: f64,
    pub sections: Vec<SectionHealth>,
    pub missing_sections: Vec<Section>,
}

const SECTION_WEIGHTS: &[(Section, f64)] = &[
    (Section::Personal, 0.20),
    (Section::Experience, 0.30),
    (Section::Education, 0.15),
    (Section::Skills, 0.15),
    (Section::Projects, 0.08),
    (Section::Certifications, 0.04),
    (Section::Languages, 0.04),
    (Section::Awards, 0.02),
    (Section::Publications, 0.01),
    (Section::Volunteer, 0.01),
];

pub fn compute_completeness_report(data: &CvData) -> CompletenessReport {
    let mut sections = Vec::new();
    let mut weighted_score_sum = 0.0;
    let mut missing_sections = Vec::new();

    for (section, weight) in SECTION_WEIGHTS {
        let entry_count = data.section_len(*section);
        let (score, recommendations) = match section {
            Section::Personal => personal_score(data),
            Section::Experience => experience_score(data),
            Section::Education => count_score(entry_count, 1, "Add your highest degree or most relevant course"),
            Section::Skills => count_score(entry_count, 6, "List at least 6 skills relevant to the roles you target"),
            Section::Projects => count_score(entry_count, 2, "Showcase a couple of projects with links"),
            _ => count_score(entry_count, 1, &format!("Consider adding {}", section.title().to_lowercase())),
        };
        let score = score.clamp(0.0, 1.0);

        let status = match score {
            s if s >= 0.8 => SectionStatus::Strong,
            s if s >= 0.5 => SectionStatus::Moderate,
            s if s > 0.0 => SectionStatus::Weak,
            _ => SectionStatus::Missing,
        };
        if status == SectionStatus::Missing {
            missing_sections.push(*section);
        }

        weighted_score_sum += score * weight;
        sections.push(SectionHealth {
            section: *section,
            score,
            entry_count,
            status,
            recommendations,
        });
    }

    let total_weight: f64 = SECTION_WEIGHTS.iter().map(|(_, w)| w).sum();
    let overall_score = if total_weight > 0.0 {
        (weighted_score_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    CompletenessReport {
        overall_score,
        sections,
        missing_sections,
    }
}

fn count_score(count: usize, target: usize, advice: &str) -> (f64, Vec<String>) {
    let score = (count as f64 / target as f64).min(1.0);
    let recommendations = if count < target {
        vec![advice.to_string()]
    } else {
        vec![]
    };
    (score, recommendations)
}

fn personal_score(data: &CvData) -> (f64, Vec<String>) {
    let p = &data.personal;
    let checks = [
        (!p.full_name.trim().is_empty(), "Add your full name"),
        (!p.email.trim().is_empty(), "Add a contact email"),
        (!p.phone.trim().is_empty(), "Add a phone number"),
        (!p.location.trim().is_empty(), "Add your city or region"),
        (!p.headline.trim().is_empty(), "Add a one-line professional headline"),
        (
            p.summary.split_whitespace().count() >= 30,
            "Write a summary of at least 30 words",
        ),
    ];
    let passed = checks.iter().filter(|(ok, _)| *ok).count();
    let recommendations = checks
        .iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, advice)| advice.to_string())
        .collect();
    (passed as f64 / checks.len() as f64, recommendations)
}

fn experience_score(data: &CvData) -> (f64, Vec<String>) {
    if data.experience.is_empty() {
        return (0.0, vec!["Add at least one work experience entry".to_string()]);
    }

    let mut recommendations = Vec::new();
    let presence = (data.experience.len() as f64 / 2.0).min(1.0);

    let bullets: Vec<&str> = data
        .experience
        .iter()
        .flat_map(|e| e.highlights.iter().map(String::as_str))
        .collect();
    let quantified = match quantified_ratio(bullets.iter().copied()) {
        Some(ratio) => {
            if ratio < 0.5 {
                recommendations.push(format!(
                    "{} of {} highlights lack a measurable result, add numbers",
                    bullets.len() - (ratio * bullets.len() as f64).round() as usize,
                    bullets.len()
                ));
            }
            ratio
        }
        None => {
            recommendations.push("Add 2 to 4 achievement highlights to each position".to_string());
            0.0
        }
    };

    let dated = data
        .experience
        .iter()
        .filter(|e| e.start_date.as_deref().is_some_and(|d| !d.trim().is_empty()))
        .count() as f64
        / data.experience.len() as f64;
    if dated < 1.0 {
        recommendations.push("Add start dates to every position".to_string());
    }
    if data.experience.len() < 2 {
        recommendations.push("Add more experience entries to build a complete picture".to_string());
    }

    (0.4 * presence + 0.4 * quantified + 0.2 * dated, recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::data::{EducationEntry, ExperienceEntry, PersonalInfo, SkillEntry};
    use uuid::Uuid;

    fn full_personal() -> PersonalInfo {
        PersonalInfo {
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+44 20 7946 0958".into(),
            location: "London".into(),
            headline: "Mathematician".into(),
            summary: "word ".repeat(30),
            ..Default::default()
        }
    }

    fn job(highlights: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            id: Uuid::new_v4(),
            company: "Acme".into(),
            start_date: Some("2020-01".into()),
            highlights: highlights.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_cv_scores_zero_and_everything_missing() {
        let report = compute_completeness_report(&CvData::default());
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.missing_sections.len(), SECTION_WEIGHTS.len());
    }

    #[test]
    fn test_complete_personal_section_is_strong() {
        let data = CvData {
            personal: full_personal(),
            ..Default::default()
        };
        let report = compute_completeness_report(&data);
        let personal = &report.sections[0];
        assert_eq!(personal.section, Section::Personal);
        assert_eq!(personal.status, SectionStatus::Strong);
        assert!(personal.recommendations.is_empty());
    }

    #[test]
    fn test_unquantified_experience_gets_recommendation() {
        let data = CvData {
            experience: vec![job(&["Worked on APIs", "Helped the team"])],
            ..Default::default()
        };
        let report = compute_completeness_report(&data);
        let exp = report
            .sections
            .iter()
            .find(|s| s.section == Section::Experience)
            .unwrap();
        assert!(exp.recommendations.iter().any(|r| r.contains("2 of 2")));
        assert!(exp.score < 0.5);
    }

    #[test]
    fn test_strong_cv_scores_high() {
        let data = CvData {
            personal: full_personal(),
            experience: vec![
                job(&["Cut costs by 20%", "Hired 5 engineers"]),
                job(&["Served 1M users"]),
            ],
            education: vec![EducationEntry {
                id: Uuid::new_v4(),
                institution: "University of London".into(),
                ..Default::default()
            }],
            skills: (0..6)
                .map(|i| SkillEntry {
                    id: Uuid::new_v4(),
                    name: format!("skill {i}"),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let report = compute_completeness_report(&data);
        assert!(report.overall_score >= 0.75, "score was {}", report.overall_score);
        assert!(!report.missing_sections.contains(&Section::Experience));
    }

    #[test]
    fn test_overall_score_bounded() {
        let report = compute_completeness_report(&CvData {
            personal: full_personal(),
            ..Default::default()
        });
        assert!((0.0..=1.0).contains(&report.overall_score));
    }
}
