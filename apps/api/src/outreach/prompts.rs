// All LLM prompt constants for the Outreach Generator.

use anyhow::anyhow;

use crate::errors::AppError;
use crate::models::jobs::JobCardRow;
use crate::models::outreach::PersonalizationSourceRow;
use crate::models::people::{ContactRow, ProfileRow};
use crate::outreach::personalization::build_personalization_block;
use crate::packs::Tone;

/// System prompt for outreach generation — enforces JSON-only output.
pub const OUTREACH_SYSTEM: &str =
    "You are an expert at concise, personable job-search outreach. \
    Write messages a real person would send, not templates. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Outreach prompt template. Replace: {company}, {title}, {contact_json},
/// {tone}, {tone_hint}, {personalization_block}, {candidate_json}
const OUTREACH_PROMPT_TEMPLATE: &str = r#"Write a four-message outreach pack for this application, in a {tone} tone.

TONE GUIDANCE: {tone_hint}

ROLE: {title} at {company}

CONTACT (may be empty — then address the hiring manager generically):
{contact_json}

CANDIDATE:
{candidate_json}

PERSONALIZATION CONTEXT (background for the recruiter email and DM only — \
NEVER reference it in the follow-ups, they are sent weeks later):
{personalization_block}

Return a JSON object with EXACTLY these four fields:
{
  "recruiter_email": "a short email asking for a conversation about the role",
  "linkedin_dm": "a 2-3 sentence connection note, under 300 characters",
  "follow_up_1": "a polite one-week follow-up on the application",
  "follow_up_2": "a final brief check-in, two weeks later"
}

RULES:
1. Keep each message under 150 words; the DM under 300 characters
2. Open each message with a greeting line; the greeting comes before everything else
3. Do not fabricate experience or mutual connections
4. The follow-ups must stand alone: no references to posts, articles, or news
5. No placeholder brackets of any kind"#;

/// Builds the outreach prompt from the job card's stored context.
pub fn build_outreach_prompt(
    job_card: &JobCardRow,
    contact: Option<&ContactRow>,
    profile: &Option<ProfileRow>,
    tone: Tone,
    sources: &[PersonalizationSourceRow],
    excerpt_cap: usize,
) -> Result<String, AppError> {
    let contact_json = match contact {
        Some(c) => serde_json::to_string(&serde_json::json!({
            "name": c.full_name,
            "has_email": c.email.is_some(),
            "has_linkedin": c.linkedin_url.is_some(),
        }))
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize contact: {e}")))?,
        None => "{}".to_string(),
    };

    let candidate_json = match profile {
        Some(p) => serde_json::to_string(&serde_json::json!({
            "name": p.full_name,
            "track": p.track,
        }))
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize profile: {e}")))?,
        None => "{}".to_string(),
    };

    let block = build_personalization_block(sources, excerpt_cap);
    let personalization_block = if block.is_empty() {
        "(none)".to_string()
    } else {
        block
    };

    Ok(OUTREACH_PROMPT_TEMPLATE
        .replace("{tone}", tone.as_str())
        .replace("{tone_hint}", tone.style_hint())
        .replace("{company}", &job_card.company)
        .replace("{title}", &job_card.title)
        .replace("{contact_json}", &contact_json)
        .replace("{candidate_json}", &candidate_json)
        .replace("{personalization_block}", &personalization_block))
}
