//! Evidence Scorer — scores a resume against a job card's extracted
//! requirements and persists an auditable breakdown.
//!
//! Flow: load preconditions → debit → completion call → all-or-nothing
//! response validation → one transaction for run + items + history.
//! A malformed response commits zero rows and triggers a refund.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::credits::{self, SCAN_COST};
use crate::credits::rate_limit::{OpFamily, RateLimiter};
use crate::errors::AppError;
use crate::evidence::prompts::{build_scoring_prompt, SCORING_SYSTEM};
use crate::evidence::scoring::compute_overall_score;
use crate::llm_client::{parse_json_response, CompletionBackend};
use crate::models::evidence::{EvidenceRunRow, RunStatus};
use crate::models::jobs::{JobCardRow, RequirementRow, RequirementType};
use crate::models::people::{ProfileRow, ResumeRow};
use crate::packs::{PackRegistry, RegionPack};

pub mod batch;
pub mod handlers;
pub mod prompts;
pub mod scoring;

// ────────────────────────────────────────────────────────────────────────────
// Completion response shapes
// ────────────────────────────────────────────────────────────────────────────

/// One per-requirement verdict as returned by the completion, before
/// validation against the requirement set.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVerdict {
    pub requirement_id: Uuid,
    pub status: String,
    pub resume_proof: String,
    pub fix: String,
    pub rewrite_a: String,
    pub rewrite_b: String,
    pub why_it_matters: String,
    pub needs_confirmation: bool,
    pub group_type: String,
}

/// A validated verdict, typed against the closed vocabularies.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub requirement_id: Uuid,
    pub status: crate::models::evidence::ItemStatus,
    pub resume_proof: String,
    pub fix: String,
    pub rewrite_a: String,
    pub rewrite_b: String,
    pub why_it_matters: String,
    pub needs_confirmation: bool,
    pub group_type: RequirementType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceStrength {
    pub score: f64,
    pub explanation: String,
    pub matched: u32,
    pub partial: u32,
    pub missing: u32,
}

/// The four weighted categories reported by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub evidence_strength: EvidenceStrength,
    pub keyword_coverage: CategoryScore,
    pub formatting_ats: CategoryScore,
    pub role_fit: CategoryScore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityFlag {
    pub rule_id: String,
    pub title: String,
    pub guidance: String,
    pub penalty: f64,
}

#[derive(Debug, Deserialize)]
pub struct ScorerResponse {
    pub items: Vec<RawVerdict>,
    pub breakdown: ScoreBreakdown,
    pub flags: Vec<EligibilityFlag>,
}

/// What the API returns for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceOutcome {
    pub run_id: Uuid,
    pub score: i32,
    pub item_count: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Gated entry point
// ────────────────────────────────────────────────────────────────────────────

/// Runs one gated scoring pass for (job card, resume).
///
/// Rate-limited and metered at 1 credit. The debit lands before the
/// completion call; every failure after it refunds exactly that amount.
/// A `request_id` that matches a previously completed call short-circuits
/// to the stored run without charging again.
pub async fn run_evidence(
    pool: &PgPool,
    backend: &dyn CompletionBackend,
    packs: &PackRegistry,
    limiter: &RateLimiter,
    job_card_id: Uuid,
    resume_id: Uuid,
    request_id: Option<Uuid>,
) -> Result<EvidenceOutcome, AppError> {
    let job_card = fetch_job_card(pool, job_card_id).await?;

    limiter.check(job_card.user_id, OpFamily::Scan).await?;

    if let Some(req_id) = request_id {
        if let Some(prior) = credits::find_completed_call(pool, "scan", req_id).await? {
            return outcome_for_run(pool, prior.artifact_id).await;
        }
    }

    let ctx = load_scoring_context(pool, packs, &job_card, resume_id).await?;

    credits::charge(pool, job_card.user_id, SCAN_COST, "evidence scan").await?;

    let marker = request_id.map(|req_id| Marker {
        operation: "scan",
        request_id: req_id,
        user_id: job_card.user_id,
    });

    match execute_scoring(pool, backend, &ctx, marker).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            credits::refund_or_log(pool, job_card.user_id, SCAN_COST, "evidence scan failed")
                .await;
            Err(e)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ungated pipeline (shared with batch sprint)
// ────────────────────────────────────────────────────────────────────────────

/// Everything a scoring pass needs, resolved up front so precondition
/// failures surface before any debit.
pub(crate) struct ScoringContext {
    pub job_card: JobCardRow,
    pub requirements: Vec<RequirementRow>,
    pub resume: ResumeRow,
    pub profile: Option<ProfileRow>,
    pub pack: RegionPack,
}

/// Success marker written inside the artifact transaction.
pub(crate) struct Marker {
    pub operation: &'static str,
    pub request_id: Uuid,
    pub user_id: Uuid,
}

pub(crate) async fn fetch_job_card(
    pool: &PgPool,
    job_card_id: Uuid,
) -> Result<JobCardRow, AppError> {
    sqlx::query_as::<_, JobCardRow>("SELECT * FROM job_cards WHERE id = $1")
        .bind(job_card_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job card {job_card_id} not found")))
}

pub(crate) async fn load_scoring_context(
    pool: &PgPool,
    packs: &PackRegistry,
    job_card: &JobCardRow,
    resume_id: Uuid,
) -> Result<ScoringContext, AppError> {
    let requirements = sqlx::query_as::<_, RequirementRow>(
        "SELECT * FROM requirements WHERE job_card_id = $1 ORDER BY created_at, id",
    )
    .bind(job_card.id)
    .fetch_all(pool)
    .await?;

    if requirements.is_empty() {
        return Err(AppError::validation(
            "NO_REQUIREMENTS",
            "No extracted requirements for this job card. Run extraction first.",
        ));
    }

    let resume = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    if resume.body_text.trim().is_empty() {
        return Err(AppError::validation(
            "NO_RESUME",
            "The selected resume has no text. Paste or import resume content first.",
        ));
    }

    let profile = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(job_card.user_id)
        .fetch_optional(pool)
        .await?;

    let pack = match &profile {
        Some(p) => packs.resolve(&p.region, &p.track).clone(),
        None => packs.resolve("", "").clone(),
    };

    Ok(ScoringContext {
        job_card: job_card.clone(),
        requirements,
        resume,
        profile,
        pack,
    })
}

/// Completion call + validation + persistence. No metering here; callers
/// own the debit/refund bracket.
pub(crate) async fn execute_scoring(
    pool: &PgPool,
    backend: &dyn CompletionBackend,
    ctx: &ScoringContext,
    marker: Option<Marker>,
) -> Result<EvidenceOutcome, AppError> {
    let prompt = build_scoring_prompt(ctx)?;
    let response = backend
        .complete(&prompt, SCORING_SYSTEM)
        .await
        .map_err(|e| AppError::upstream("LLM_ERROR", format!("Evidence scoring failed: {e}")))?;

    let parsed: ScorerResponse = parse_json_response(&response).map_err(|e| {
        AppError::upstream(
            "LLM_ERROR",
            format!("Evidence scoring returned unparseable output: {e}"),
        )
    })?;

    validate_breakdown(&parsed.breakdown)
        .map_err(|e| AppError::upstream("LLM_ERROR", format!("Invalid score breakdown: {e}")))?;

    let verdicts = reconcile_verdicts(&ctx.requirements, parsed.items)
        .map_err(|e| AppError::upstream("LLM_ERROR", format!("Invalid verdict set: {e}")))?;

    let score = compute_overall_score(
        &parsed.breakdown,
        &verdicts,
        &ctx.pack.weights,
        &parsed.flags,
    );

    let breakdown_value = serde_json::json!({
        "categories": parsed.breakdown,
        "flags": parsed.flags,
    });

    let run_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO evidence_runs
            (id, job_card_id, resume_id, status, overall_score, score_breakdown,
             pack_region, pack_track)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(run_id)
    .bind(ctx.job_card.id)
    .bind(ctx.resume.id)
    .bind(RunStatus::Completed.as_str())
    .bind(score)
    .bind(&breakdown_value)
    .bind(&ctx.pack.region)
    .bind(&ctx.pack.track)
    .execute(&mut *tx)
    .await?;

    for verdict in &verdicts {
        sqlx::query(
            r#"
            INSERT INTO evidence_items
                (id, run_id, requirement_id, status, resume_proof, fix,
                 rewrite_a, rewrite_b, why_it_matters, needs_confirmation, group_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(run_id)
        .bind(verdict.requirement_id)
        .bind(verdict.status.as_str())
        .bind(&verdict.resume_proof)
        .bind(&verdict.fix)
        .bind(&verdict.rewrite_a)
        .bind(&verdict.rewrite_b)
        .bind(&verdict.why_it_matters)
        .bind(verdict.needs_confirmation)
        .bind(verdict.group_type.as_str())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO score_history (id, job_card_id, resume_id, run_id, score) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(ctx.job_card.id)
    .bind(ctx.resume.id)
    .bind(run_id)
    .bind(score)
    .execute(&mut *tx)
    .await?;

    if let Some(m) = marker {
        credits::record_completed_call(&mut tx, m.operation, m.request_id, m.user_id, run_id)
            .await?;
    }

    tx.commit().await?;

    info!(
        "Evidence run {run_id}: score {score}/100, {} items for job card {}",
        verdicts.len(),
        ctx.job_card.id
    );

    Ok(EvidenceOutcome {
        run_id,
        score,
        item_count: verdicts.len(),
    })
}

async fn outcome_for_run(pool: &PgPool, run_id: Uuid) -> Result<EvidenceOutcome, AppError> {
    let run = sqlx::query_as::<_, EvidenceRunRow>("SELECT * FROM evidence_runs WHERE id = $1")
        .bind(run_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Evidence run {run_id} not found")))?;

    let item_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM evidence_items WHERE run_id = $1")
            .bind(run_id)
            .fetch_one(pool)
            .await?;

    Ok(EvidenceOutcome {
        run_id: run.id,
        score: run.overall_score,
        item_count: item_count as usize,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Response validation
// ────────────────────────────────────────────────────────────────────────────

/// Checks the verdict set is a bijection onto the requirement set and that
/// every closed-vocabulary field parses. Any defect fails the whole
/// response; partial verdict sets are never trusted.
fn reconcile_verdicts(
    requirements: &[RequirementRow],
    raw: Vec<RawVerdict>,
) -> Result<Vec<Verdict>, String> {
    if raw.len() != requirements.len() {
        return Err(format!(
            "expected {} verdicts, got {}",
            requirements.len(),
            raw.len()
        ));
    }

    let mut by_requirement: std::collections::HashMap<Uuid, RawVerdict> =
        std::collections::HashMap::new();
    for verdict in raw {
        let id = verdict.requirement_id;
        if by_requirement.insert(id, verdict).is_some() {
            return Err(format!("duplicate verdict for requirement {id}"));
        }
    }

    let mut verdicts = Vec::with_capacity(requirements.len());
    for requirement in requirements {
        let raw = by_requirement
            .remove(&requirement.id)
            .ok_or_else(|| format!("no verdict for requirement {}", requirement.id))?;

        let status = raw.status.parse().map_err(|e: String| e)?;
        let group_type: RequirementType = raw.group_type.parse().map_err(|e: String| e)?;

        verdicts.push(Verdict {
            requirement_id: requirement.id,
            status,
            resume_proof: raw.resume_proof,
            fix: raw.fix,
            rewrite_a: raw.rewrite_a,
            rewrite_b: raw.rewrite_b,
            why_it_matters: raw.why_it_matters,
            needs_confirmation: raw.needs_confirmation,
            group_type,
        });
    }

    Ok(verdicts)
}

fn validate_breakdown(breakdown: &ScoreBreakdown) -> Result<(), String> {
    let categories = [
        ("evidence_strength", breakdown.evidence_strength.score),
        ("keyword_coverage", breakdown.keyword_coverage.score),
        ("formatting_ats", breakdown.formatting_ats.score),
        ("role_fit", breakdown.role_fit.score),
    ];
    for (name, score) in categories {
        if !(0.0..=100.0).contains(&score) {
            return Err(format!("category '{name}' score {score} outside [0, 100]"));
        }
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn requirement(id: Uuid, ty: &str) -> RequirementRow {
        RequirementRow {
            id,
            job_card_id: Uuid::new_v4(),
            requirement_type: ty.to_string(),
            requirement_text: "Python".to_string(),
            created_at: Utc::now(),
        }
    }

    fn verdict_for(id: Uuid, status: &str) -> RawVerdict {
        RawVerdict {
            requirement_id: id,
            status: status.to_string(),
            resume_proof: "3 years Python development".to_string(),
            fix: "Mention Python in the summary".to_string(),
            rewrite_a: "Built data pipelines in Python".to_string(),
            rewrite_b: "Delivered Python services in production".to_string(),
            why_it_matters: "Listed as a core skill".to_string(),
            needs_confirmation: false,
            group_type: "skill".to_string(),
        }
    }

    fn breakdown(score: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            evidence_strength: EvidenceStrength {
                score,
                explanation: "ok".to_string(),
                matched: 1,
                partial: 0,
                missing: 0,
            },
            keyword_coverage: CategoryScore {
                score,
                explanation: "ok".to_string(),
            },
            formatting_ats: CategoryScore {
                score,
                explanation: "ok".to_string(),
            },
            role_fit: CategoryScore {
                score,
                explanation: "ok".to_string(),
            },
        }
    }

    #[test]
    fn test_reconcile_accepts_exact_bijection() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let reqs = vec![requirement(a, "skill"), requirement(b, "tool")];
        let raw = vec![verdict_for(b, "partial"), verdict_for(a, "matched")];

        let verdicts = reconcile_verdicts(&reqs, raw).unwrap();
        assert_eq!(verdicts.len(), 2);
        // Output follows requirement order, not response order.
        assert_eq!(verdicts[0].requirement_id, a);
        assert_eq!(verdicts[1].requirement_id, b);
    }

    #[test]
    fn test_reconcile_rejects_count_mismatch() {
        let a = Uuid::new_v4();
        let reqs = vec![requirement(a, "skill"), requirement(Uuid::new_v4(), "tool")];
        let raw = vec![verdict_for(a, "matched")];
        assert!(reconcile_verdicts(&reqs, raw).is_err());
    }

    #[test]
    fn test_reconcile_rejects_duplicate_verdicts() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let reqs = vec![requirement(a, "skill"), requirement(b, "tool")];
        let raw = vec![verdict_for(a, "matched"), verdict_for(a, "missing")];
        assert!(reconcile_verdicts(&reqs, raw).is_err());
    }

    #[test]
    fn test_reconcile_rejects_unknown_requirement_id() {
        let a = Uuid::new_v4();
        let reqs = vec![requirement(a, "skill")];
        let raw = vec![verdict_for(Uuid::new_v4(), "matched")];
        assert!(reconcile_verdicts(&reqs, raw).is_err());
    }

    #[test]
    fn test_reconcile_rejects_bad_status() {
        let a = Uuid::new_v4();
        let reqs = vec![requirement(a, "skill")];
        let raw = vec![verdict_for(a, "sort-of")];
        assert!(reconcile_verdicts(&reqs, raw).is_err());
    }

    #[test]
    fn test_reconcile_rejects_bad_group_type() {
        let a = Uuid::new_v4();
        let reqs = vec![requirement(a, "skill")];
        let mut bad = verdict_for(a, "matched");
        bad.group_type = "charisma".to_string();
        assert!(reconcile_verdicts(&reqs, vec![bad]).is_err());
    }

    #[test]
    fn test_validate_breakdown_accepts_bounds() {
        assert!(validate_breakdown(&breakdown(0.0)).is_ok());
        assert!(validate_breakdown(&breakdown(100.0)).is_ok());
    }

    #[test]
    fn test_validate_breakdown_rejects_out_of_range() {
        assert!(validate_breakdown(&breakdown(101.0)).is_err());
        assert!(validate_breakdown(&breakdown(-1.0)).is_err());
    }

    #[test]
    fn test_scorer_response_deserializes_full_shape() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{
                "items": [{{
                    "requirement_id": "{id}",
                    "status": "matched",
                    "resume_proof": "3 years Python",
                    "fix": "",
                    "rewrite_a": "Shipped Python services",
                    "rewrite_b": "Built Python tooling",
                    "why_it_matters": "Core requirement",
                    "needs_confirmation": false,
                    "group_type": "skill"
                }}],
                "breakdown": {{
                    "evidence_strength": {{"score": 80, "explanation": "solid", "matched": 1, "partial": 0, "missing": 0}},
                    "keyword_coverage": {{"score": 70, "explanation": "most keywords present"}},
                    "formatting_ats": {{"score": 90, "explanation": "clean"}},
                    "role_fit": {{"score": 75, "explanation": "close"}}
                }},
                "flags": [{{"rule_id": "sponsorship-mismatch", "title": "t", "guidance": "g", "penalty": 15}}]
            }}"#
        );
        let parsed: ScorerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.flags.len(), 1);
        assert!((parsed.breakdown.evidence_strength.score - 80.0).abs() < f64::EPSILON);
    }
}
