use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::plans::{effective_tier, PlanTier};

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub plan_tier: String,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Tier the user is entitled to right now. Lapsed subscriptions fall back to free.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> PlanTier {
        let stored = self.plan_tier.parse().unwrap_or(PlanTier::Free);
        effective_tier(stored, self.plan_expires_at, now)
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub plan_tier: PlanTier,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_row(row: &UserRow, now: DateTime<Utc>) -> Self {
        Self {
            id: row.id,
            email: row.email.clone(),
            name: row.name.clone(),
            plan_tier: row.effective_plan(now),
            plan_expires_at: row.plan_expires_at,
            created_at: row.created_at,
        }
    }
}
