use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Optional. Without it, rate limiting falls back to an in-process limiter.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_secs: i64,
    pub openai_api_key: String,
    pub openai_base_url: String,
    /// Public origin of the front-end, used to build share links.
    pub app_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub ai_rate_limit_per_minute: u32,
    pub auth_rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_expiry_secs: parse_env("JWT_EXPIRY_SECS", 60 * 60 * 24 * 7)?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| crate::llm_client::DEFAULT_BASE_URL.to_string()),
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ai_rate_limit_per_minute: parse_env("AI_RATE_LIMIT_PER_MINUTE", 10)?,
            auth_rate_limit_per_minute: parse_env("AUTH_RATE_LIMIT_PER_MINUTE", 5)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}
