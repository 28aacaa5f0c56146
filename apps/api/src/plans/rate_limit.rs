//! Pluggable, trait-based request rate limiting.
//!
//! `RedisRateLimiter` counts requests in a shared fixed window so every API
//! replica sees the same budget. `LocalRateLimiter` keeps the budget in process
//! memory and is used when no Redis is configured.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota,
};
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, warn};

use crate::errors::AppError;

const WINDOW_SECS: u64 = 60;

/// The local limiter drops idle keys once every this many checks.
const PRUNE_EVERY: u64 = 1024;

/// Carried in `AppState` as `Arc<dyn RateLimiter>`, one instance per scope.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one request for `key`. Returns `RateLimited` once the budget is spent.
    async fn check(&self, key: &str) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Redis fixed window
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisRateLimiter {
    conn: ConnectionManager,
    scope: &'static str,
    per_minute: u32,
}

impl RedisRateLimiter {
    pub fn new(conn: ConnectionManager, scope: &'static str, per_minute: u32) -> Self {
        Self {
            conn,
            scope,
            per_minute,
        }
    }

    async fn hit(&self, key: &str) -> redis::RedisResult<Option<u64>> {
        let mut conn = self.conn.clone();
        let redis_key = window_key(self.scope, key);

        let (count, ttl): (i64, i64) = redis::pipe()
            .atomic()
            .incr(&redis_key, 1)
            .ttl(&redis_key)
            .query_async(&mut conn)
            .await?;

        let window = judge_window(count, ttl, self.per_minute);
        if window.needs_expiry {
            let _: () = conn.expire(&redis_key, WINDOW_SECS as i64).await?;
        }
        Ok(window.retry_after_secs)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct WindowVerdict {
    needs_expiry: bool,
    retry_after_secs: Option<u64>,
}

/// Reads the counter and TTL taken together after an `INCR`. A key with no
/// expiry (new, or one whose earlier `EXPIRE` failed) gets a full window.
fn judge_window(count: i64, ttl: i64, per_minute: u32) -> WindowVerdict {
    let needs_expiry = ttl < 0;
    let remaining = if needs_expiry { WINDOW_SECS as i64 } else { ttl };
    WindowVerdict {
        needs_expiry,
        retry_after_secs: (count > per_minute as i64).then(|| remaining.max(1) as u64),
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<(), AppError> {
        match self.hit(key).await {
            Ok(None) => Ok(()),
            Ok(Some(retry_after_secs)) => {
                warn!("Rate limit hit for {}:{key}", self.scope);
                Err(AppError::RateLimited { retry_after_secs })
            }
            Err(e) => {
                // Redis outage must not lock users out of the API.
                warn!("Rate limiter unavailable, allowing request: {e}");
                Ok(())
            }
        }
    }
}

fn window_key(scope: &str, key: &str) -> String {
    format!("ratelimit:{scope}:{key}")
}

// ────────────────────────────────────────────────────────────────────────────
// In-process limiter (governor)
// ────────────────────────────────────────────────────────────────────────────

pub struct LocalRateLimiter<C: Clock = DefaultClock> {
    limiter: governor::RateLimiter<
        String,
        DefaultKeyedStateStore<String>,
        C,
        NoOpMiddleware<<C as Clock>::Instant>,
    >,
    clock: C,
    scope: &'static str,
    checks: AtomicU64,
}

impl LocalRateLimiter {
    pub fn new(scope: &'static str, per_minute: u32) -> Self {
        Self::with_clock(scope, per_minute, DefaultClock::default())
    }
}

impl<C: Clock> LocalRateLimiter<C> {
    fn with_clock(scope: &'static str, per_minute: u32, clock: C) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: governor::RateLimiter::dashmap_with_clock(Quota::per_minute(per_minute), &clock),
            clock,
            scope,
            checks: AtomicU64::new(0),
        }
    }

    /// Forgets keys whose budget has fully replenished.
    fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(
            "Pruned {} idle {} rate limit keys",
            before.saturating_sub(self.limiter.len()),
            self.scope
        );
    }
}

#[async_trait]
impl<C> RateLimiter for LocalRateLimiter<C>
where
    C: Clock + Send + Sync,
{
    async fn check(&self, key: &str) -> Result<(), AppError> {
        let outcome = self.limiter.check_key(&key.to_string());
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }
        match outcome {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                warn!("Rate limit hit for {}:{key}", self.scope);
                Err(AppError::RateLimited {
                    retry_after_secs: wait.as_secs().max(1),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use std::time::Duration;

    #[tokio::test]
    async fn test_local_limiter_allows_burst_up_to_quota() {
        let limiter = LocalRateLimiter::new("test", 3);
        for _ in 0..3 {
            assert!(limiter.check("user-1").await.is_ok());
        }
        let err = limiter.check("user-1").await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited { retry_after_secs } if retry_after_secs >= 1));
    }

    #[tokio::test]
    async fn test_local_limiter_keys_are_independent() {
        let limiter = LocalRateLimiter::new("test", 1);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_err());
        assert!(limiter.check("b").await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_quota_is_treated_as_one() {
        let limiter = LocalRateLimiter::new("test", 0);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("a").await.is_err());
    }

    #[tokio::test]
    async fn test_local_limiter_forgets_idle_keys() {
        let clock = FakeRelativeClock::default();
        let limiter = LocalRateLimiter::with_clock("test", 1, clock.clone());
        for i in 0..PRUNE_EVERY - 1 {
            assert!(limiter.check(&format!("user-{i}@example.com")).await.is_ok());
        }
        assert_eq!(limiter.limiter.len(), (PRUNE_EVERY - 1) as usize);

        clock.advance(Duration::from_secs(WINDOW_SECS + 1));
        assert!(limiter.check("fresh@example.com").await.is_ok());
        assert_eq!(limiter.limiter.len(), 1);
    }

    #[tokio::test]
    async fn test_local_limiter_keeps_limited_keys_through_prune() {
        let clock = FakeRelativeClock::default();
        let limiter = LocalRateLimiter::with_clock("test", 1, clock.clone());
        assert!(limiter.check("a").await.is_ok());
        clock.advance(Duration::from_secs(10));
        limiter.prune();
        assert!(limiter.check("a").await.is_err());
    }

    #[test]
    fn test_window_under_budget() {
        assert_eq!(
            judge_window(1, -1, 3),
            WindowVerdict {
                needs_expiry: true,
                retry_after_secs: None
            }
        );
        assert_eq!(
            judge_window(3, 42, 3),
            WindowVerdict {
                needs_expiry: false,
                retry_after_secs: None
            }
        );
    }

    #[test]
    fn test_window_over_budget_reports_ttl() {
        assert_eq!(
            judge_window(4, 30, 3),
            WindowVerdict {
                needs_expiry: false,
                retry_after_secs: Some(30)
            }
        );
        assert_eq!(judge_window(4, 0, 3).retry_after_secs, Some(1));
    }

    #[test]
    fn test_counter_without_expiry_gets_one_back() {
        // INCR landed but EXPIRE never did: the window must still close.
        let verdict = judge_window(57, -1, 3);
        assert!(verdict.needs_expiry);
        assert_eq!(verdict.retry_after_secs, Some(WINDOW_SECS));
    }

    #[test]
    fn test_window_key_is_namespaced_by_scope() {
        assert_eq!(window_key("ai", "u1"), "ratelimit:ai:u1");
        assert_ne!(window_key("ai", "u1"), window_key("auth", "u1"));
    }
}
