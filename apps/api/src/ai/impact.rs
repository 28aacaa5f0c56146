use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactGap {
    pub bullet: String,
    pub reason: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactCheck {
    pub passed: bool,
    pub gaps: Vec<ImpactGap>,
}

const VAGUE_VERBS: &[&str] = &[
    "responsible for",
    "worked on",
    "helped",
    "assisted",
    "involved in",
    "participated",
    "supported",
    "improved",
    "enhanced",
];

const VAGUE_SCALE_WORDS: &[&str] = &[
    "significant",
    "major",
    "large",
    "huge",
    "massive",
    "substantial",
    "many",
    "numerous",
    "various",
    "several",
];

/// Checks whether a CV bullet states a measurable outcome.
///
/// PASS: a digit, `%`, a currency sign, or `~N` estimate.
/// FAIL: everything else, with the first vague verb / scale word called out.
pub fn check_impact(text: &str) -> ImpactCheck {
    let text_lower = text.to_lowercase();

    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let has_percent = text.contains('%');
    let has_currency = text.contains('$') || text.contains('€') || text.contains('£');

    if has_digit || has_percent || has_currency {
        return ImpactCheck {
            passed: true,
            gaps: vec![],
        };
    }

    let mut gaps = Vec::new();

    if let Some(vague) = VAGUE_VERBS.iter().find(|v| text_lower.contains(*v)) {
        gaps.push(ImpactGap {
            bullet: text.to_string(),
            reason: format!("Uses vague phrasing '{vague}' without a measurable result"),
            suggestion: format!(
                "Replace '{vague}' with a strong action verb and add the outcome: by how much, how many, how fast?"
            ),
        });
    }

    if let Some(vague) = VAGUE_SCALE_WORDS.iter().find(|v| text_lower.contains(*v)) {
        gaps.push(ImpactGap {
            bullet: text.to_string(),
            reason: format!("Uses vague scale word '{vague}' without a number"),
            suggestion: format!("Replace '{vague}' with a specific number, e.g. '40%', '3x', '12 people'"),
        });
    }

    if gaps.is_empty() {
        gaps.push(ImpactGap {
            bullet: text.to_string(),
            reason: "No quantified outcome found".to_string(),
            suggestion: "Add a metric: a number, percentage, amount, or time saved".to_string(),
        });
    }

    ImpactCheck {
        passed: false,
        gaps,
    }
}

/// Fraction of bullets that are quantified. `None` when there are no bullets.
pub fn quantified_ratio<'a>(bullets: impl IntoIterator<Item = &'a str>) -> Option<f64> {
    let (total, quantified) = bullets
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .fold((0usize, 0usize), |(total, ok), b| {
            (total + 1, ok + usize::from(check_impact(b).passed))
        });
    (total > 0).then(|| quantified as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_with_percentage() {
        assert!(check_impact("Reduced latency by 40% through caching").passed);
    }

    #[test]
    fn test_pass_with_dollar_amount() {
        assert!(check_impact("Saved $50,000 annually by renegotiating vendor contracts").passed);
    }

    #[test]
    fn test_pass_with_euro() {
        assert!(check_impact("Generated €200k in new revenue").passed);
    }

    #[test]
    fn test_pass_with_count() {
        assert!(check_impact("Mentored 4 junior developers").passed);
    }

    #[test]
    fn test_pass_with_tilde_estimate() {
        assert!(check_impact("Cut onboarding time by ~2 weeks").passed);
    }

    #[test]
    fn test_fail_responsible_for() {
        let r = check_impact("Responsible for the billing system");
        assert!(!r.passed);
        assert!(r.gaps[0].reason.contains("responsible for"));
    }

    #[test]
    fn test_fail_vague_scale_word() {
        let r = check_impact("Delivered significant performance gains");
        assert!(!r.passed);
        assert!(r.gaps.iter().any(|g| g.reason.contains("significant")));
    }

    #[test]
    fn test_fail_reports_both_verb_and_scale() {
        let r = check_impact("Helped various teams ship features");
        assert_eq!(r.gaps.len(), 2);
    }

    #[test]
    fn test_fail_generic_statement() {
        let r = check_impact("Architected the authentication service");
        assert!(!r.passed);
        assert_eq!(r.gaps[0].reason, "No quantified outcome found");
    }

    #[test]
    fn test_quantified_ratio_mixed() {
        let ratio = quantified_ratio(["Cut costs 20%", "Worked on APIs", "  "]).unwrap();
        assert!((ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quantified_ratio_empty_is_none() {
        assert_eq!(quantified_ratio(Vec::<&str>::new()), None);
    }
}
