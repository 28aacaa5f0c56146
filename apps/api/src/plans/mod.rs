//! Subscription plans: tier resolution and the limits each tier grants.
//!
//! AI call volume is bounded per day and per month (`quota`), request bursts are
//! bounded per minute (`rate_limit`). Both are keyed by user id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod quota;
pub mod rate_limit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Premium,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Premium => "premium",
            PlanTier::Enterprise => "enterprise",
        }
    }

    pub fn limits(&self) -> PlanLimits {
        PlanLimits::for_tier(*self)
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "premium" => Ok(PlanTier::Premium),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(format!("unknown plan tier '{other}'")),
        }
    }
}

/// Resolves the tier a user is entitled to at `now`.
/// A paid tier whose expiry has passed is treated as free; free never expires.
pub fn effective_tier(
    tier: PlanTier,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PlanTier {
    match (tier, expires_at) {
        (PlanTier::Free, _) => PlanTier::Free,
        (paid, Some(expiry)) if expiry <= now => {
            tracing::debug!("{paid} plan expired at {expiry}, falling back to free");
            PlanTier::Free
        }
        (paid, _) => paid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub ai_calls_per_day: u32,
    pub ai_calls_per_month: u32,
    /// `None` means unlimited.
    pub max_cvs: Option<u32>,
    pub premium_templates: bool,
    pub ai_ats_scoring: bool,
}

impl PlanLimits {
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => PlanLimits {
                ai_calls_per_day: 5,
                ai_calls_per_month: 50,
                max_cvs: Some(3),
                premium_templates: false,
                ai_ats_scoring: false,
            },
            PlanTier::Premium => PlanLimits {
                ai_calls_per_day: 50,
                ai_calls_per_month: 1_000,
                max_cvs: None,
                premium_templates: true,
                ai_ats_scoring: true,
            },
            PlanTier::Enterprise => PlanLimits {
                ai_calls_per_day: 500,
                ai_calls_per_month: 10_000,
                max_cvs: None,
                premium_templates: true,
                ai_ats_scoring: true,
            },
        }
    }

    /// Returns true if a user already owning `current` CVs may create another one.
    pub fn allows_new_cv(&self, current: i64) -> bool {
        match self.max_cvs {
            Some(max) => current < max as i64,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_tier_parses_case_insensitively() {
        assert_eq!("Premium".parse::<PlanTier>().unwrap(), PlanTier::Premium);
        assert_eq!(" enterprise ".parse::<PlanTier>().unwrap(), PlanTier::Enterprise);
        assert!("gold".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_expired_premium_falls_back_to_free() {
        let now = Utc::now();
        let tier = effective_tier(PlanTier::Premium, Some(now - Duration::days(1)), now);
        assert_eq!(tier, PlanTier::Free);
    }

    #[test]
    fn test_active_premium_is_kept() {
        let now = Utc::now();
        let tier = effective_tier(PlanTier::Premium, Some(now + Duration::days(30)), now);
        assert_eq!(tier, PlanTier::Premium);
    }

    #[test]
    fn test_paid_tier_without_expiry_never_lapses() {
        let now = Utc::now();
        assert_eq!(
            effective_tier(PlanTier::Enterprise, None, now),
            PlanTier::Enterprise
        );
    }

    #[test]
    fn test_free_cv_cap_is_three() {
        let limits = PlanLimits::for_tier(PlanTier::Free);
        assert!(limits.allows_new_cv(2));
        assert!(!limits.allows_new_cv(3));
    }

    #[test]
    fn test_paid_tiers_have_unlimited_cvs() {
        assert!(PlanTier::Premium.limits().allows_new_cv(10_000));
        assert!(PlanTier::Enterprise.limits().allows_new_cv(10_000));
    }

    #[test]
    fn test_limits_grow_with_tier() {
        let free = PlanTier::Free.limits();
        let premium = PlanTier::Premium.limits();
        let enterprise = PlanTier::Enterprise.limits();
        assert!(free.ai_calls_per_day < premium.ai_calls_per_day);
        assert!(premium.ai_calls_per_month < enterprise.ai_calls_per_month);
        assert!(!free.ai_ats_scoring && premium.ai_ats_scoring);
    }
}
