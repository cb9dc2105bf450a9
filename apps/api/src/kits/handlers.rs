//! Axum route handlers for the Application Kit Generator.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::kits::{generate_kit, GenerateKitRequest, KitResponse};
use crate::state::AppState;

/// POST /api/v1/kits/generate
///
/// Builds the kit for a completed evidence run. Free with the scan but
/// rate-limited; overwriting an existing kit requires confirm_overwrite.
pub async fn handle_generate_kit(
    State(state): State<AppState>,
    Json(request): Json<GenerateKitRequest>,
) -> Result<Json<KitResponse>, AppError> {
    let response = generate_kit(
        &state.db,
        state.completion.as_ref(),
        &state.packs,
        &state.limiter,
        request,
    )
    .await?;
    Ok(Json(response))
}
