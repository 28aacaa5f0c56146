//! Registry of CV layout templates the front-end knows how to render.

use serde::Serialize;

use crate::errors::AppError;
use crate::plans::PlanLimits;

pub const DEFAULT_TEMPLATE: &str = "modern";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub premium: bool,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "classic",
        name: "Classic",
        premium: false,
    },
    Template {
        id: "modern",
        name: "Modern",
        premium: false,
    },
    Template {
        id: "minimal",
        name: "Minimal",
        premium: false,
    },
    Template {
        id: "executive",
        name: "Executive",
        premium: true,
    },
    Template {
        id: "creative",
        name: "Creative",
        premium: true,
    },
    Template {
        id: "technical",
        name: "Technical",
        premium: true,
    },
];

pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Checks that `id` names a known template the plan is allowed to use.
pub fn ensure_allowed(id: &str, limits: &PlanLimits) -> Result<&'static Template, AppError> {
    let template =
        find(id).ok_or_else(|| AppError::Validation(format!("Unknown template '{id}'")))?;
    if template.premium && !limits.premium_templates {
        return Err(AppError::PlanRequired(format!(
            "Template '{}' requires a premium plan",
            template.name
        )));
    }
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::PlanTier;

    #[test]
    fn test_default_template_is_free() {
        let template = find(DEFAULT_TEMPLATE).unwrap();
        assert!(!template.premium);
    }

    #[test]
    fn test_free_plan_rejects_premium_template() {
        let err = ensure_allowed("executive", &PlanTier::Free.limits()).unwrap_err();
        assert!(matches!(err, AppError::PlanRequired(_)));
    }

    #[test]
    fn test_premium_plan_accepts_premium_template() {
        assert!(ensure_allowed("executive", &PlanTier::Premium.limits()).is_ok());
    }

    #[test]
    fn test_unknown_template_is_validation_error() {
        let err = ensure_allowed("neon", &PlanTier::Enterprise.limits()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_template_ids_are_unique() {
        for (i, a) in TEMPLATES.iter().enumerate() {
            assert!(TEMPLATES[i + 1..].iter().all(|b| b.id != a.id));
        }
    }
}
