//! Axum route handlers for the Evidence Scorer.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evidence::batch::{run_batch_sprint, BatchSprintRequest, BatchSprintResponse};
use crate::evidence::{run_evidence, EvidenceOutcome};
use crate::models::evidence::{EvidenceItemRow, EvidenceRunRow, ScoreHistoryRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub job_card_id: Uuid,
    pub resume_id: Uuid,
    /// Optional idempotency key; a repeat with the same key returns the
    /// stored run without charging again.
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RunDetailResponse {
    pub run: EvidenceRunRow,
    pub items: Vec<EvidenceItemRow>,
    pub history: Vec<ScoreHistoryRow>,
}

/// POST /api/v1/evidence/run
///
/// One gated scoring pass: 1 credit, rate-limited, refunded on any
/// failure after the debit.
pub async fn handle_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<EvidenceOutcome>, AppError> {
    let outcome = run_evidence(
        &state.db,
        state.completion.as_ref(),
        &state.packs,
        &state.limiter,
        request.job_card_id,
        request.resume_id,
        request.request_id,
    )
    .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/evidence/runs/:id
///
/// Returns the run, its per-requirement items, and the score timeline for
/// its (job card, resume) pair.
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunDetailResponse>, AppError> {
    let run = sqlx::query_as::<_, EvidenceRunRow>("SELECT * FROM evidence_runs WHERE id = $1")
        .bind(run_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Evidence run {run_id} not found")))?;

    let items = sqlx::query_as::<_, EvidenceItemRow>(
        "SELECT * FROM evidence_items WHERE run_id = $1 ORDER BY created_at, id",
    )
    .bind(run_id)
    .fetch_all(&state.db)
    .await?;

    let history = sqlx::query_as::<_, ScoreHistoryRow>(
        "SELECT * FROM score_history WHERE job_card_id = $1 AND resume_id = $2 \
         ORDER BY created_at",
    )
    .bind(run.job_card_id)
    .bind(run.resume_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(RunDetailResponse {
        run,
        items,
        history,
    }))
}

/// POST /api/v1/evidence/batch-sprint
///
/// Scores up to 10 job cards against one resume for a flat 5-credit fee.
/// Pass the returned sprint_id back to retry only the failed subset, free.
pub async fn handle_batch_sprint(
    State(state): State<AppState>,
    Json(request): Json<BatchSprintRequest>,
) -> Result<Json<BatchSprintResponse>, AppError> {
    let response = run_batch_sprint(
        &state.db,
        Arc::clone(&state.completion),
        Arc::clone(&state.packs),
        &state.limiter,
        state.config.batch_refund_policy,
        request,
    )
    .await?;
    Ok(Json(response))
}
