use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::credits::rate_limit::RateLimiter;
use crate::llm_client::CompletionBackend;
use crate::packs::PackRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// The completion seam. Production wires `LlmClient`; tests script it.
    pub completion: Arc<dyn CompletionBackend>,
    pub config: Config,
    /// Region/track packs, resolved per operation and injected explicitly.
    pub packs: Arc<PackRegistry>,
    /// Per-user, per-operation-family sliding-window limiter.
    pub limiter: Arc<RateLimiter>,
}
