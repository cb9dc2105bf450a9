//! Application Kit Generator — turns a completed evidence run into
//! resume-improvement artifacts: a priority-ordered top-changes list,
//! bullet rewrites with confirmation flags, and a tone-conditioned cover
//! letter.
//!
//! Kits are bundled free with a completed scan (no debit) but still
//! rate-limited. Regenerating over an existing kit requires explicit
//! confirmation so previously downloaded content is never silently
//! replaced.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::credits::rate_limit::{OpFamily, RateLimiter};
use crate::errors::AppError;
use crate::evidence::fetch_job_card;
use crate::kits::filenames::{artifact_filename, ArtifactKind};
use crate::kits::prompts::{build_cover_letter_prompt, COVER_LETTER_SYSTEM};
use crate::llm_client::{parse_json_response, CompletionBackend};
use crate::models::evidence::{EvidenceItemRow, EvidenceRunRow, ItemStatus, RunStatus};
use crate::models::jobs::{RequirementRow, RequirementType};
use crate::models::kits::ApplicationKitRow;
use crate::models::people::{ProfileRow, ResumeRow};
use crate::packs::{PackRegistry, ScoringWeights, Tone};

pub mod filenames;
pub mod handlers;
pub mod prompts;

// ────────────────────────────────────────────────────────────────────────────
// Request / artifact types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateKitRequest {
    pub job_card_id: Uuid,
    pub resume_id: Uuid,
    pub evidence_run_id: Uuid,
    /// Defaults to the resolved pack's tone when omitted.
    pub tone: Option<Tone>,
    /// Required to overwrite an existing kit for this run.
    #[serde(default)]
    pub confirm_overwrite: bool,
}

/// One entry of the priority-ordered top-changes list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopChange {
    pub requirement_text: String,
    pub status: ItemStatus,
    pub group_type: RequirementType,
    pub fix: String,
}

/// One gap with two independently phrased rewrite variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletRewrite {
    pub requirement_text: String,
    pub rewrite_a: String,
    pub rewrite_b: String,
    /// True when a rewrite asserts a claim the resume proof does not support.
    pub needs_confirmation: bool,
}

#[derive(Debug, Serialize)]
pub struct KitResponse {
    pub kit: ApplicationKitRow,
    pub artifact_filenames: Vec<String>,
}

/// An evidence item joined with its requirement text; the unit the pure
/// ranking functions work on.
#[derive(Debug, Clone)]
struct GapView {
    requirement_text: String,
    status: ItemStatus,
    group_type: RequirementType,
    fix: String,
    rewrite_a: String,
    rewrite_b: String,
    needs_confirmation: bool,
}

#[derive(Debug, Deserialize)]
struct CoverLetterResponse {
    cover_letter: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_kit(
    pool: &PgPool,
    backend: &dyn CompletionBackend,
    packs: &PackRegistry,
    limiter: &RateLimiter,
    request: GenerateKitRequest,
) -> Result<KitResponse, AppError> {
    let job_card = fetch_job_card(pool, request.job_card_id).await?;

    limiter.check(job_card.user_id, OpFamily::Kit).await?;

    let run = sqlx::query_as::<_, EvidenceRunRow>("SELECT * FROM evidence_runs WHERE id = $1")
        .bind(request.evidence_run_id)
        .fetch_optional(pool)
        .await?;

    let run = match run {
        Some(r)
            if r.job_card_id == request.job_card_id
                && r.resume_id == request.resume_id
                && r.status == RunStatus::Completed.as_str() =>
        {
            r
        }
        _ => {
            return Err(AppError::validation(
                "NO_EVIDENCE_RUN",
                "No completed evidence run for this job card and resume. Run a scan first.",
            ))
        }
    };

    let requirements = sqlx::query_as::<_, RequirementRow>(
        "SELECT * FROM requirements WHERE job_card_id = $1",
    )
    .bind(request.job_card_id)
    .fetch_all(pool)
    .await?;

    if requirements.is_empty() {
        return Err(AppError::validation(
            "NO_REQUIREMENTS",
            "No extracted requirements for this job card. Run extraction first.",
        ));
    }

    let existing = sqlx::query_as::<_, ApplicationKitRow>(
        "SELECT * FROM application_kits \
         WHERE job_card_id = $1 AND resume_id = $2 AND evidence_run_id = $3",
    )
    .bind(request.job_card_id)
    .bind(request.resume_id)
    .bind(request.evidence_run_id)
    .fetch_optional(pool)
    .await?;

    if existing.is_some() && !request.confirm_overwrite {
        return Err(AppError::Conflict(
            "A kit already exists for this evidence run. \
             Pass confirm_overwrite to replace it — the previous kit will be discarded."
                .to_string(),
        ));
    }

    let resume = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(request.resume_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {} not found", request.resume_id)))?;

    let items = sqlx::query_as::<_, EvidenceItemRow>(
        "SELECT * FROM evidence_items WHERE run_id = $1 ORDER BY created_at, id",
    )
    .bind(run.id)
    .fetch_all(pool)
    .await?;

    let profile = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(job_card.user_id)
        .fetch_optional(pool)
        .await?;

    let pack = match &profile {
        Some(p) => packs.resolve(&p.region, &p.track),
        None => packs.resolve("", ""),
    };
    let tone = request.tone.unwrap_or(pack.default_tone);

    let gaps = join_gaps(&requirements, &items)
        .map_err(|e| AppError::Internal(anyhow!("Corrupt evidence items: {e}")))?;

    let top_changes = build_top_changes(&gaps, &pack.weights);
    let bullet_rewrites = build_bullet_rewrites(&gaps);

    let prompt = build_cover_letter_prompt(&job_card, &resume, &top_changes, tone)?;
    let response = backend
        .complete(&prompt, COVER_LETTER_SYSTEM)
        .await
        .map_err(|e| {
            AppError::upstream("LLM_ERROR", format!("Cover letter generation failed: {e}"))
        })?;
    let cover_letter: CoverLetterResponse = parse_json_response(&response).map_err(|e| {
        AppError::upstream(
            "LLM_ERROR",
            format!("Cover letter generation returned unparseable output: {e}"),
        )
    })?;

    let top_changes_value = serde_json::to_value(&top_changes)
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize top changes: {e}")))?;
    let rewrites_value = serde_json::to_value(&bullet_rewrites)
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize rewrites: {e}")))?;

    // Whole-row upsert: a regenerated kit never mixes fields with its
    // predecessor.
    let kit = sqlx::query_as::<_, ApplicationKitRow>(
        r#"
        INSERT INTO application_kits
            (id, job_card_id, resume_id, evidence_run_id, tone, top_changes,
             bullet_rewrites, cover_letter)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (job_card_id, resume_id, evidence_run_id) DO UPDATE SET
            tone = EXCLUDED.tone,
            top_changes = EXCLUDED.top_changes,
            bullet_rewrites = EXCLUDED.bullet_rewrites,
            cover_letter = EXCLUDED.cover_letter,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.job_card_id)
    .bind(request.resume_id)
    .bind(request.evidence_run_id)
    .bind(tone.as_str())
    .bind(&top_changes_value)
    .bind(&rewrites_value)
    .bind(&cover_letter.cover_letter)
    .fetch_one(pool)
    .await?;

    let user_name = profile
        .as_ref()
        .map(|p| p.full_name.as_str())
        .unwrap_or("applicant");
    let today = chrono::Utc::now().date_naive();
    let artifact_filenames = ArtifactKind::ALL
        .iter()
        .map(|kind| artifact_filename(user_name, &job_card.company, today, *kind))
        .collect();

    info!(
        "Generated kit {} for run {} ({} top changes, {} rewrites)",
        kit.id,
        run.id,
        top_changes.len(),
        bullet_rewrites.len()
    );

    Ok(KitResponse {
        kit,
        artifact_filenames,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Pure assembly
// ────────────────────────────────────────────────────────────────────────────

fn join_gaps(
    requirements: &[RequirementRow],
    items: &[EvidenceItemRow],
) -> Result<Vec<GapView>, String> {
    let text_by_id: std::collections::HashMap<Uuid, &str> = requirements
        .iter()
        .map(|r| (r.id, r.requirement_text.as_str()))
        .collect();

    items
        .iter()
        .map(|item| {
            let requirement_text = text_by_id
                .get(&item.requirement_id)
                .ok_or_else(|| format!("item {} references unknown requirement", item.id))?
                .to_string();
            Ok(GapView {
                requirement_text,
                status: item.status.parse()?,
                group_type: item.group_type.parse()?,
                fix: item.fix.clone(),
                rewrite_a: item.rewrite_a.clone(),
                rewrite_b: item.rewrite_b.clone(),
                needs_confirmation: item.needs_confirmation,
            })
        })
        .collect()
}

/// Missing items outrank partial ones; within each band the pack's group
/// weight decides, so the changes the user sees first are the ones their
/// region's scoring cares most about.
fn build_top_changes(gaps: &[GapView], weights: &ScoringWeights) -> Vec<TopChange> {
    let mut changes: Vec<&GapView> = gaps
        .iter()
        .filter(|g| matches!(g.status, ItemStatus::Missing | ItemStatus::Partial))
        .collect();

    changes.sort_by(|a, b| {
        let band = |g: &GapView| match g.status {
            ItemStatus::Missing => 0,
            ItemStatus::Partial => 1,
            ItemStatus::Matched => 2,
        };
        band(a).cmp(&band(b)).then(
            weights
                .for_group(b.group_type)
                .partial_cmp(&weights.for_group(a.group_type))
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    changes
        .into_iter()
        .map(|g| TopChange {
            requirement_text: g.requirement_text.clone(),
            status: g.status,
            group_type: g.group_type,
            fix: g.fix.clone(),
        })
        .collect()
}

fn build_bullet_rewrites(gaps: &[GapView]) -> Vec<BulletRewrite> {
    gaps.iter()
        .filter(|g| matches!(g.status, ItemStatus::Missing | ItemStatus::Partial))
        .map(|g| BulletRewrite {
            requirement_text: g.requirement_text.clone(),
            rewrite_a: g.rewrite_a.clone(),
            rewrite_b: g.rewrite_b.clone(),
            needs_confirmation: g.needs_confirmation,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
