mod ai;
mod auth;
mod config;
mod cv;
mod db;
mod errors;
mod llm_client;
mod models;
mod plans;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::ats::{KeywordAtsScorer, LlmAtsScorer};
use crate::auth::jwt::JwtKeys;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::plans::rate_limit::{LocalRateLimiter, RateLimiter, RedisRateLimiter};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vitae API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize rate limiters: Redis when configured, in-process otherwise
    let (ai_limiter, auth_limiter) = build_rate_limiters(&config).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())
        .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        db,
        jwt: JwtKeys::new(&config.jwt_secret, config.jwt_expiry_secs),
        ai_limiter,
        auth_limiter,
        keyword_ats: Arc::new(KeywordAtsScorer),
        llm_ats: Arc::new(LlmAtsScorer::new(llm.clone())),
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_rate_limiters(
    config: &Config,
) -> Result<(Arc<dyn RateLimiter>, Arc<dyn RateLimiter>)> {
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            let conn = client
                .get_connection_manager()
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis rate limiter initialized");
            Ok((
                Arc::new(RedisRateLimiter::new(
                    conn.clone(),
                    "ai",
                    config.ai_rate_limit_per_minute,
                )),
                Arc::new(RedisRateLimiter::new(
                    conn,
                    "auth",
                    config.auth_rate_limit_per_minute,
                )),
            ))
        }
        None => {
            warn!("REDIS_URL not set; rate limits are enforced per process");
            Ok((
                Arc::new(LocalRateLimiter::new("ai", config.ai_rate_limit_per_minute)),
                Arc::new(LocalRateLimiter::new(
                    "auth",
                    config.auth_rate_limit_per_minute,
                )),
            ))
        }
    }
}
