//! Axum route handlers for the Requirement Extractor.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::extract_requirements;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub job_card_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub count: usize,
}

/// POST /api/v1/requirements/extract
///
/// Parses the job card's newest JD snapshot into typed requirements,
/// replacing any previously extracted set.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let count =
        extract_requirements(&state.db, state.completion.as_ref(), request.job_card_id).await?;
    Ok(Json(ExtractResponse { count }))
}
