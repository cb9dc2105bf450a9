//! Axum route handlers for the Outreach Generator.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::outreach::{generate_pack, GeneratePackRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GeneratePackResponse {
    pub recruiter_email: String,
    pub linkedin_dm: String,
    pub follow_up_1: String,
    pub follow_up_2: String,
}

/// POST /api/v1/outreach/generate
///
/// Generates the four-message pack for a job card. 1 credit,
/// rate-limited; the stored pack is replaced wholesale.
pub async fn handle_generate_pack(
    State(state): State<AppState>,
    Json(request): Json<GeneratePackRequest>,
) -> Result<Json<GeneratePackResponse>, AppError> {
    let pack = generate_pack(
        &state.db,
        state.completion.as_ref(),
        &state.packs,
        &state.limiter,
        state.config.personalization_excerpt_cap,
        request,
    )
    .await?;

    Ok(Json(GeneratePackResponse {
        recruiter_email: pack.recruiter_email,
        linkedin_dm: pack.linkedin_dm,
        follow_up_1: pack.follow_up_1,
        follow_up_2: pack.follow_up_2,
    }))
}
