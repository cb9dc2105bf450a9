mod config;
mod credits;
mod db;
mod errors;
mod evidence;
mod extraction;
mod kits;
mod llm_client;
mod models;
mod outreach;
mod packs;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::credits::rate_limit::RateLimiter;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::packs::PackRegistry;
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

    info!("Starting scoring pipeline API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Region/track packs — weight vectors are validated here, at startup
    let packs = Arc::new(PackRegistry::builtin()?);
    info!("Region pack registry initialized");

    // Sliding-window rate limiter shared by all metered operations
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_window_secs,
        config.rate_limit_max_per_window,
    ));

    // Build app state
    let state = AppState {
        db,
        completion: Arc::new(llm),
        config: config.clone(),
        packs,
        limiter,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
