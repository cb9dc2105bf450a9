pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::credits;
use crate::evidence;
use crate::extraction;
use crate::kits;
use crate::outreach;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Requirement Extractor (free)
        .route(
            "/api/v1/requirements/extract",
            post(extraction::handlers::handle_extract),
        )
        // Evidence Scorer (metered)
        .route("/api/v1/evidence/run", post(evidence::handlers::handle_run))
        .route(
            "/api/v1/evidence/runs/:id",
            get(evidence::handlers::handle_get_run),
        )
        .route(
            "/api/v1/evidence/batch-sprint",
            post(evidence::handlers::handle_batch_sprint),
        )
        // Application Kits (free with a completed scan, rate-limited)
        .route(
            "/api/v1/kits/generate",
            post(kits::handlers::handle_generate_kit),
        )
        // Outreach (metered)
        .route(
            "/api/v1/outreach/generate",
            post(outreach::handlers::handle_generate_pack),
        )
        // Credits
        .route(
            "/api/v1/credits/balance",
            get(credits::handlers::handle_balance),
        )
        .with_state(state)
}
