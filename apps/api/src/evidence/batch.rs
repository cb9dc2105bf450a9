//! Batch Sprint Orchestrator — fans the Evidence Scorer out over up to 10
//! job cards against one resume.
//!
//! The sprint charges one flat block fee up front; per-card failures are
//! independent and never abort siblings. Sprint and item rows persist the
//! outcome so the failed subset can be retried later without re-charging
//! cards that already succeeded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::BatchRefundPolicy;
use crate::credits::rate_limit::{OpFamily, RateLimiter};
use crate::credits::{self, BATCH_SPRINT_COST};
use crate::errors::AppError;
use crate::evidence::{execute_scoring, fetch_job_card, load_scoring_context, EvidenceOutcome};
use crate::llm_client::CompletionBackend;
use crate::models::evidence::{BatchSprintItemRow, BatchSprintRow};
use crate::models::people::ResumeRow;
use crate::packs::PackRegistry;

pub const MAX_SPRINT_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
pub struct BatchSprintRequest {
    pub job_card_ids: Vec<Uuid>,
    pub resume_id: Uuid,
    /// Present on a retry: re-run only this sprint's failed items, free.
    pub sprint_id: Option<Uuid>,
    /// Client idempotency key for sprint creation.
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SprintItemResult {
    pub job_card_id: Uuid,
    pub run_id: Option<Uuid>,
    pub score: Option<i32>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchSprintResponse {
    pub sprint_id: Uuid,
    pub results: Vec<SprintItemResult>,
}

/// Runs (or retries) a batch sprint.
pub async fn run_batch_sprint(
    pool: &PgPool,
    backend: Arc<dyn CompletionBackend>,
    packs: Arc<PackRegistry>,
    limiter: &RateLimiter,
    refund_policy: BatchRefundPolicy,
    request: BatchSprintRequest,
) -> Result<BatchSprintResponse, AppError> {
    let resume = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(request.resume_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {} not found", request.resume_id)))?;

    limiter.check(resume.user_id, OpFamily::Batch).await?;

    let (sprint, pending, charged) = match request.sprint_id {
        Some(sprint_id) => prepare_retry(pool, sprint_id, &resume).await?,
        None => {
            if let Some(req_id) = request.request_id {
                if let Some(prior) = credits::find_completed_call(pool, "batch", req_id).await? {
                    let results = load_results(pool, prior.artifact_id).await?;
                    return Ok(BatchSprintResponse {
                        sprint_id: prior.artifact_id,
                        results,
                    });
                }
            }
            create_sprint(pool, &resume, &request).await?
        }
    };

    let total_pending = pending.len();
    let mut failed = 0usize;

    let mut tasks: JoinSet<(Uuid, Result<EvidenceOutcome, AppError>)> = JoinSet::new();
    for item in pending {
        let pool = pool.clone();
        let backend = Arc::clone(&backend);
        let packs = Arc::clone(&packs);
        let resume_id = resume.id;
        tasks.spawn(async move {
            let outcome = score_one(&pool, backend.as_ref(), &packs, item.job_card_id, resume_id)
                .await;
            (item.job_card_id, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (job_card_id, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Sprint {} worker task failed: {e}", sprint.id);
                continue;
            }
        };

        match outcome {
            Ok(result) => {
                sqlx::query(
                    "UPDATE batch_sprint_items \
                     SET run_id = $1, score = $2, error = NULL, updated_at = NOW() \
                     WHERE sprint_id = $3 AND job_card_id = $4",
                )
                .bind(result.run_id)
                .bind(result.score)
                .bind(sprint.id)
                .bind(job_card_id)
                .execute(pool)
                .await?;
            }
            Err(e) => {
                failed += 1;
                sqlx::query(
                    "UPDATE batch_sprint_items SET error = $1, updated_at = NOW() \
                     WHERE sprint_id = $2 AND job_card_id = $3",
                )
                .bind(e.to_string())
                .bind(sprint.id)
                .bind(job_card_id)
                .execute(pool)
                .await?;
            }
        }
    }

    if charged
        && refund_policy == BatchRefundPolicy::FullOnTotalFailure
        && total_pending > 0
        && failed == total_pending
    {
        credits::refund_or_log(
            pool,
            resume.user_id,
            BATCH_SPRINT_COST,
            "batch sprint fully failed",
        )
        .await;
    }

    let results = load_results(pool, sprint.id).await?;
    info!(
        "Sprint {}: {} of {} item(s) failed this pass",
        sprint.id, failed, total_pending
    );

    Ok(BatchSprintResponse {
        sprint_id: sprint.id,
        results,
    })
}

/// One ungated scoring pass; precondition failures stay per-item.
async fn score_one(
    pool: &PgPool,
    backend: &dyn CompletionBackend,
    packs: &PackRegistry,
    job_card_id: Uuid,
    resume_id: Uuid,
) -> Result<EvidenceOutcome, AppError> {
    let job_card = fetch_job_card(pool, job_card_id).await?;
    let ctx = load_scoring_context(pool, packs, &job_card, resume_id).await?;
    execute_scoring(pool, backend, &ctx, None).await
}

/// Charges the flat fee and persists the sprint skeleton: one item row per
/// job card, all pending.
async fn create_sprint(
    pool: &PgPool,
    resume: &ResumeRow,
    request: &BatchSprintRequest,
) -> Result<(BatchSprintRow, Vec<BatchSprintItemRow>, bool), AppError> {
    let mut seen = std::collections::HashSet::new();
    let job_card_ids: Vec<Uuid> = request
        .job_card_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if job_card_ids.is_empty() || job_card_ids.len() > MAX_SPRINT_SIZE {
        return Err(AppError::validation(
            "VALIDATION_ERROR",
            format!("A sprint takes between 1 and {MAX_SPRINT_SIZE} job cards"),
        ));
    }

    credits::charge(pool, resume.user_id, BATCH_SPRINT_COST, "batch sprint").await?;

    let sprint_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO batch_sprints (id, user_id, resume_id, fee) VALUES ($1, $2, $3, $4)",
    )
    .bind(sprint_id)
    .bind(resume.user_id)
    .bind(resume.id)
    .bind(BATCH_SPRINT_COST)
    .execute(&mut *tx)
    .await?;

    for job_card_id in &job_card_ids {
        sqlx::query(
            "INSERT INTO batch_sprint_items (id, sprint_id, job_card_id) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(sprint_id)
        .bind(job_card_id)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(req_id) = request.request_id {
        credits::record_completed_call(&mut tx, "batch", req_id, resume.user_id, sprint_id)
            .await?;
    }

    tx.commit().await?;

    let items = fetch_items(pool, sprint_id).await?;
    Ok((fetch_sprint(pool, sprint_id).await?, items, true))
}

/// Loads an existing sprint for a retry pass; only items without a run are
/// re-scored, and no fee is charged.
async fn prepare_retry(
    pool: &PgPool,
    sprint_id: Uuid,
    resume: &ResumeRow,
) -> Result<(BatchSprintRow, Vec<BatchSprintItemRow>, bool), AppError> {
    let sprint = fetch_sprint(pool, sprint_id).await?;

    if sprint.resume_id != resume.id {
        return Err(AppError::validation(
            "VALIDATION_ERROR",
            "A sprint retry must use the same resume as the original sprint",
        ));
    }

    let pending: Vec<BatchSprintItemRow> = fetch_items(pool, sprint_id)
        .await?
        .into_iter()
        .filter(|item| item.run_id.is_none())
        .collect();

    Ok((sprint, pending, false))
}

async fn fetch_sprint(pool: &PgPool, sprint_id: Uuid) -> Result<BatchSprintRow, AppError> {
    sqlx::query_as::<_, BatchSprintRow>("SELECT * FROM batch_sprints WHERE id = $1")
        .bind(sprint_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Batch sprint {sprint_id} not found")))
}

async fn fetch_items(
    pool: &PgPool,
    sprint_id: Uuid,
) -> Result<Vec<BatchSprintItemRow>, AppError> {
    let items = sqlx::query_as::<_, BatchSprintItemRow>(
        "SELECT * FROM batch_sprint_items WHERE sprint_id = $1 ORDER BY id",
    )
    .bind(sprint_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

async fn load_results(
    pool: &PgPool,
    sprint_id: Uuid,
) -> Result<Vec<SprintItemResult>, AppError> {
    let results = fetch_items(pool, sprint_id)
        .await?
        .into_iter()
        .map(|item| SprintItemResult {
            job_card_id: item.job_card_id,
            run_id: item.run_id,
            score: item.score,
            error: item.error,
        })
        .collect();
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprint_item_result_serializes_failure_shape() {
        let result = SprintItemResult {
            job_card_id: Uuid::new_v4(),
            run_id: None,
            score: None,
            error: Some("No extracted requirements for this job card".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["run_id"].is_null());
        assert!(json["score"].is_null());
        assert!(json["error"].as_str().unwrap().contains("requirements"));
    }

    #[test]
    fn test_sprint_item_result_serializes_success_shape() {
        let run_id = Uuid::new_v4();
        let result = SprintItemResult {
            job_card_id: Uuid::new_v4(),
            run_id: Some(run_id),
            score: Some(82),
            error: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["score"], 82);
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_batch_request_deserializes_without_optional_fields() {
        let json = serde_json::json!({
            "job_card_ids": [Uuid::new_v4(), Uuid::new_v4()],
            "resume_id": Uuid::new_v4(),
        });
        let request: BatchSprintRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.job_card_ids.len(), 2);
        assert!(request.sprint_id.is_none());
        assert!(request.request_id.is_none());
    }
}
