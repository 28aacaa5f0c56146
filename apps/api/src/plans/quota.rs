//! Per-user AI call quotas, stored as period counters in `usage_limits`.
//!
//! Counters are keyed `day:YYYY-MM-DD` and `month:YYYY-MM` (UTC). A call reserves
//! one unit of both counters in a single transaction before the LLM is contacted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::TokenUsage;
use crate::models::usage::{TokenUsageRow, UsageLimitRow};
use crate::plans::PlanLimits;

const RESERVE_SQL: &str = r#"
    INSERT INTO usage_limits (user_id, period_key, count, updated_at)
    VALUES ($1, $2, 1, NOW())
    ON CONFLICT (user_id, period_key)
    DO UPDATE SET count = usage_limits.count + 1, updated_at = NOW()
    WHERE usage_limits.count < $3
    RETURNING count
"#;

const RELEASE_SQL: &str = r#"
    UPDATE usage_limits
    SET count = GREATEST(count - 1, 0), updated_at = NOW()
    WHERE user_id = $1 AND period_key = $2
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKeys {
    pub day: String,
    pub month: String,
}

impl PeriodKeys {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            day: format!("day:{}", now.format("%Y-%m-%d")),
            month: format!("month:{}", now.format("%Y-%m")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub used_today: u32,
    pub daily_limit: u32,
    pub used_this_month: u32,
    pub monthly_limit: u32,
}

impl UsageSnapshot {
    pub fn remaining_today(&self) -> u32 {
        self.daily_limit
            .saturating_sub(self.used_today)
            .min(self.monthly_limit.saturating_sub(self.used_this_month))
    }
}

/// Reserves one AI call for `user_id`. Fails with `QuotaExceeded` when either the
/// daily or the monthly counter is already at its plan limit; nothing is counted then.
pub async fn reserve_ai_call(
    pool: &PgPool,
    user_id: Uuid,
    limits: &PlanLimits,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot, AppError> {
    let keys = PeriodKeys::at(now);
    let mut tx = pool.begin().await?;

    let day_count: Option<i32> = sqlx::query_scalar(RESERVE_SQL)
        .bind(user_id)
        .bind(&keys.day)
        .bind(limits.ai_calls_per_day as i32)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(day_count) = day_count else {
        tx.rollback().await?;
        warn!("User {user_id} hit daily AI limit ({})", limits.ai_calls_per_day);
        return Err(AppError::QuotaExceeded(format!(
            "Daily limit of {} AI requests reached",
            limits.ai_calls_per_day
        )));
    };

    let month_count: Option<i32> = sqlx::query_scalar(RESERVE_SQL)
        .bind(user_id)
        .bind(&keys.month)
        .bind(limits.ai_calls_per_month as i32)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(month_count) = month_count else {
        tx.rollback().await?;
        warn!(
            "User {user_id} hit monthly AI limit ({})",
            limits.ai_calls_per_month
        );
        return Err(AppError::QuotaExceeded(format!(
            "Monthly limit of {} AI requests reached",
            limits.ai_calls_per_month
        )));
    };

    tx.commit().await?;

    Ok(UsageSnapshot {
        used_today: day_count.max(0) as u32,
        daily_limit: limits.ai_calls_per_day,
        used_this_month: month_count.max(0) as u32,
        monthly_limit: limits.ai_calls_per_month,
    })
}

/// Gives back a reservation whose LLM call failed.
pub async fn release_ai_call(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let keys = PeriodKeys::at(now);
    let mut tx = pool.begin().await?;
    for key in [&keys.day, &keys.month] {
        sqlx::query(RELEASE_SQL)
            .bind(user_id)
            .bind(key)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    info!("Released AI reservation for user {user_id}");
    Ok(())
}

pub async fn record_token_usage(
    pool: &PgPool,
    user_id: Uuid,
    feature: &str,
    usage: &TokenUsage,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO token_usage (id, user_id, feature, model, prompt_tokens, completion_tokens)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(feature)
    .bind(&usage.model)
    .bind(usage.prompt_tokens as i32)
    .bind(usage.completion_tokens as i32)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn usage_snapshot(
    pool: &PgPool,
    user_id: Uuid,
    limits: &PlanLimits,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot, AppError> {
    let keys = PeriodKeys::at(now);
    let rows = sqlx::query_as::<_, UsageLimitRow>(
        "SELECT * FROM usage_limits WHERE user_id = $1 AND period_key IN ($2, $3)",
    )
    .bind(user_id)
    .bind(&keys.day)
    .bind(&keys.month)
    .fetch_all(pool)
    .await?;

    let count_for = |key: &str| {
        rows.iter()
            .find(|r| r.period_key == key)
            .map(|r| r.count.max(0) as u32)
            .unwrap_or(0)
    };

    Ok(UsageSnapshot {
        used_today: count_for(&keys.day),
        daily_limit: limits.ai_calls_per_day,
        used_this_month: count_for(&keys.month),
        monthly_limit: limits.ai_calls_per_month,
    })
}

pub async fn recent_token_usage(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<TokenUsageRow>, AppError> {
    Ok(sqlx::query_as::<_, TokenUsageRow>(
        "SELECT * FROM token_usage WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::users::insert_user;
    use crate::plans::PlanTier;
    use chrono::TimeZone;

    #[test]
    fn test_period_keys_are_utc_day_and_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let keys = PeriodKeys::at(now);
        assert_eq!(keys.day, "day:2026-03-09");
        assert_eq!(keys.month, "month:2026-03");
    }

    #[test]
    fn test_period_keys_roll_over_at_midnight() {
        let before = PeriodKeys::at(Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap());
        let after = PeriodKeys::at(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert_ne!(before.day, after.day);
        assert_ne!(before.month, after.month);
    }

    #[test]
    fn test_remaining_today_bounded_by_month() {
        let snapshot = UsageSnapshot {
            used_today: 1,
            daily_limit: 5,
            used_this_month: 49,
            monthly_limit: 50,
        };
        assert_eq!(snapshot.remaining_today(), 1);
    }

    #[test]
    fn test_remaining_today_never_underflows() {
        let snapshot = UsageSnapshot {
            used_today: 9,
            daily_limit: 5,
            used_this_month: 9,
            monthly_limit: 50,
        };
        assert_eq!(snapshot.remaining_today(), 0);
    }

    async fn user(pool: &PgPool) -> Uuid {
        let email = format!("{}@example.com", Uuid::new_v4());
        insert_user(pool, &email, "not-a-hash", "Ada").await.unwrap().id
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_reservation_stops_at_daily_limit(pool: PgPool) {
        let user_id = user(&pool).await;
        let limits = PlanTier::Free.limits();
        let now = Utc::now();
        for _ in 0..limits.ai_calls_per_day {
            reserve_ai_call(&pool, user_id, &limits, now).await.unwrap();
        }

        let err = reserve_ai_call(&pool, user_id, &limits, now).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded(_)));
        let usage = usage_snapshot(&pool, user_id, &limits, now).await.unwrap();
        assert_eq!(usage.used_today, limits.ai_calls_per_day);
        assert_eq!(usage.used_this_month, limits.ai_calls_per_day);
        assert_eq!(usage.remaining_today(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_monthly_limit_rolls_back_daily_count(pool: PgPool) {
        let user_id = user(&pool).await;
        let limits = PlanLimits {
            ai_calls_per_month: 2,
            ..PlanTier::Premium.limits()
        };
        let now = Utc::now();
        reserve_ai_call(&pool, user_id, &limits, now).await.unwrap();
        reserve_ai_call(&pool, user_id, &limits, now).await.unwrap();

        let err = reserve_ai_call(&pool, user_id, &limits, now).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded(_)));
        let usage = usage_snapshot(&pool, user_id, &limits, now).await.unwrap();
        assert_eq!(usage.used_today, 2);
        assert_eq!(usage.used_this_month, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_release_gives_the_call_back(pool: PgPool) {
        let user_id = user(&pool).await;
        let limits = PlanTier::Free.limits();
        let now = Utc::now();
        reserve_ai_call(&pool, user_id, &limits, now).await.unwrap();
        release_ai_call(&pool, user_id, now).await.unwrap();
        release_ai_call(&pool, user_id, now).await.unwrap();

        let usage = usage_snapshot(&pool, user_id, &limits, now).await.unwrap();
        assert_eq!(usage.used_today, 0);
        assert_eq!(usage.used_this_month, 0);
    }
}
