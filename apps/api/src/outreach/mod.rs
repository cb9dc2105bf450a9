//! Outreach Generator — produces the four-message pack for a job card:
//! recruiter email, LinkedIn DM, and two follow-ups.
//!
//! The model drafts the prose; the deterministic guards in `guards` then
//! enforce salutations, contact-detail injection, leak scrubbing, and tone
//! regardless of what the model produced. Regeneration replaces the stored
//! pack wholesale.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::credits::rate_limit::{OpFamily, RateLimiter};
use crate::credits::{self, OUTREACH_COST};
use crate::errors::AppError;
use crate::evidence::fetch_job_card;
use crate::llm_client::{parse_json_response, CompletionBackend};
use crate::models::outreach::{OutreachPackRow, PersonalizationSourceRow};
use crate::models::people::{ContactRow, ProfileRow};
use crate::outreach::guards::{
    fix_contact_email, fix_linkedin_url, fix_salutation, sanitize_tone,
    scrub_personalization_leaks, Channel,
};
use crate::outreach::prompts::{build_outreach_prompt, OUTREACH_SYSTEM};
use crate::packs::{PackRegistry, Tone};

pub mod guards;
pub mod handlers;
pub mod personalization;
pub mod prompts;

#[derive(Debug, Deserialize)]
pub struct GeneratePackRequest {
    pub job_card_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub tone: Option<Tone>,
    /// Client idempotency key; a repeat returns the stored pack, uncharged.
    pub request_id: Option<Uuid>,
}

/// The four message fields as drafted by the model, before the guards run.
#[derive(Debug, Clone, Deserialize)]
pub struct OutreachDraft {
    pub recruiter_email: String,
    pub linkedin_dm: String,
    pub follow_up_1: String,
    pub follow_up_2: String,
}

/// Contact fields the guards need; all optional.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ContactDetails<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
}

pub async fn generate_pack(
    pool: &PgPool,
    backend: &dyn CompletionBackend,
    packs: &PackRegistry,
    limiter: &RateLimiter,
    excerpt_cap: usize,
    request: GeneratePackRequest,
) -> Result<OutreachPackRow, AppError> {
    let job_card = fetch_job_card(pool, request.job_card_id).await?;

    limiter.check(job_card.user_id, OpFamily::Outreach).await?;

    if let Some(req_id) = request.request_id {
        if let Some(prior) = credits::find_completed_call(pool, "outreach", req_id).await? {
            return fetch_pack(pool, prior.artifact_id).await;
        }
    }

    let contact = match request.contact_id {
        Some(contact_id) => {
            let contact = sqlx::query_as::<_, ContactRow>("SELECT * FROM contacts WHERE id = $1")
                .bind(contact_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Contact {contact_id} not found")))?;
            if contact.job_card_id != job_card.id {
                return Err(AppError::validation(
                    "VALIDATION_ERROR",
                    "The contact does not belong to this job card",
                ));
            }
            Some(contact)
        }
        None => None,
    };

    let profile = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(job_card.user_id)
        .fetch_optional(pool)
        .await?;

    let pack = match &profile {
        Some(p) => packs.resolve(&p.region, &p.track),
        None => packs.resolve("", ""),
    };
    let tone = request.tone.unwrap_or(pack.default_tone);

    // Up to 5 stored sources; the prompt block uses the 3 newest.
    let sources = sqlx::query_as::<_, PersonalizationSourceRow>(
        "SELECT * FROM personalization_sources WHERE job_card_id = $1 \
         ORDER BY created_at DESC LIMIT 5",
    )
    .bind(job_card.id)
    .fetch_all(pool)
    .await?;

    credits::charge(pool, job_card.user_id, OUTREACH_COST, "outreach pack").await?;

    let draft = match draft_pack(
        backend,
        &job_card,
        contact.as_ref(),
        &profile,
        tone,
        &sources,
        excerpt_cap,
    )
    .await
    {
        Ok(draft) => draft,
        Err(e) => {
            credits::refund_or_log(
                pool,
                job_card.user_id,
                OUTREACH_COST,
                "outreach pack failed",
            )
            .await;
            return Err(e);
        }
    };

    let details = ContactDetails {
        name: contact.as_ref().and_then(|c| c.full_name.as_deref()),
        email: contact.as_ref().and_then(|c| c.email.as_deref()),
        linkedin_url: contact.as_ref().and_then(|c| c.linkedin_url.as_deref()),
    };
    let finalized = finalize_pack(draft, &details);

    let stored = match persist_pack(
        pool,
        &job_card,
        contact.as_ref().map(|c| c.id),
        &finalized,
        request.request_id,
    )
    .await
    {
        Ok(row) => row,
        Err(e) => {
            credits::refund_or_log(
                pool,
                job_card.user_id,
                OUTREACH_COST,
                "outreach pack persist failed",
            )
            .await;
            return Err(e);
        }
    };

    info!("Generated outreach pack {} for job card {}", stored.id, job_card.id);
    Ok(stored)
}

/// Wholesale replacement: the pack row is never mixed field-by-field with
/// a previous generation. The idempotency marker commits with it.
async fn persist_pack(
    pool: &PgPool,
    job_card: &crate::models::jobs::JobCardRow,
    contact_id: Option<Uuid>,
    finalized: &OutreachDraft,
    request_id: Option<Uuid>,
) -> Result<OutreachPackRow, AppError> {
    let mut tx = pool.begin().await?;

    let stored = sqlx::query_as::<_, OutreachPackRow>(
        r#"
        INSERT INTO outreach_packs
            (id, job_card_id, contact_id, recruiter_email, linkedin_dm,
             follow_up_1, follow_up_2)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (job_card_id) DO UPDATE SET
            contact_id = EXCLUDED.contact_id,
            recruiter_email = EXCLUDED.recruiter_email,
            linkedin_dm = EXCLUDED.linkedin_dm,
            follow_up_1 = EXCLUDED.follow_up_1,
            follow_up_2 = EXCLUDED.follow_up_2,
            created_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_card.id)
    .bind(contact_id)
    .bind(&finalized.recruiter_email)
    .bind(&finalized.linkedin_dm)
    .bind(&finalized.follow_up_1)
    .bind(&finalized.follow_up_2)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(req_id) = request_id {
        credits::record_completed_call(&mut tx, "outreach", req_id, job_card.user_id, stored.id)
            .await?;
    }

    tx.commit().await?;
    Ok(stored)
}

async fn draft_pack(
    backend: &dyn CompletionBackend,
    job_card: &crate::models::jobs::JobCardRow,
    contact: Option<&ContactRow>,
    profile: &Option<ProfileRow>,
    tone: Tone,
    sources: &[PersonalizationSourceRow],
    excerpt_cap: usize,
) -> Result<OutreachDraft, AppError> {
    let prompt = build_outreach_prompt(job_card, contact, profile, tone, sources, excerpt_cap)?;
    let response = backend
        .complete(&prompt, OUTREACH_SYSTEM)
        .await
        .map_err(|e| {
            AppError::upstream("LLM_ERROR", format!("Outreach generation failed: {e}"))
        })?;

    parse_json_response(&response).map_err(|e| {
        AppError::upstream(
            "LLM_ERROR",
            format!("Outreach generation returned unparseable output: {e}"),
        )
    })
}

/// Applies every deterministic guard in order: tone sanitization, leak
/// scrubbing (follow-ups only), salutation correction, then contact-detail
/// injection so the injected header line is always the first line.
pub(crate) fn finalize_pack(draft: OutreachDraft, contact: &ContactDetails) -> OutreachDraft {
    let recruiter_email = fix_contact_email(
        &fix_salutation(
            &sanitize_tone(&draft.recruiter_email),
            contact.name,
            Channel::Email,
        ),
        contact.email,
    );

    let linkedin_dm = fix_linkedin_url(
        &fix_salutation(
            &sanitize_tone(&draft.linkedin_dm),
            contact.name,
            Channel::Linkedin,
        ),
        contact.linkedin_url,
    );

    let follow_up = |text: &str| {
        fix_salutation(
            &scrub_personalization_leaks(&sanitize_tone(text)),
            contact.name,
            Channel::Email,
        )
    };

    OutreachDraft {
        recruiter_email,
        linkedin_dm,
        follow_up_1: follow_up(&draft.follow_up_1),
        follow_up_2: follow_up(&draft.follow_up_2),
    }
}

async fn fetch_pack(pool: &PgPool, pack_id: Uuid) -> Result<OutreachPackRow, AppError> {
    sqlx::query_as::<_, OutreachPackRow>("SELECT * FROM outreach_packs WHERE id = $1")
        .bind(pack_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Outreach pack {pack_id} not found")))
}
