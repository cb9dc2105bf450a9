// All LLM prompt constants for the Application Kit Generator.

use anyhow::anyhow;

use crate::errors::AppError;
use crate::kits::TopChange;
use crate::models::jobs::JobCardRow;
use crate::models::people::ResumeRow;
use crate::packs::Tone;

/// System prompt for cover letter generation — enforces JSON-only output.
pub const COVER_LETTER_SYSTEM: &str =
    "You are an expert cover letter writer working from verified resume content. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent experience the resume does not contain.";

/// Cover letter prompt template. Replace: {tone}, {tone_hint}, {company},
/// {title}, {gaps_json}, {resume_text}
const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter for the role below, in a {tone} tone.

TONE GUIDANCE: {tone_hint}

ROLE: {title} at {company}

KNOWN GAPS between the resume and the posting (address the top ones honestly, do not fabricate coverage):
{gaps_json}

RESUME (source of truth — only claim what it supports):
{resume_text}

Return a JSON object:
{
  "cover_letter": "the full letter as plain text, 3-4 short paragraphs, no header block"
}"#;

/// Builds the cover letter prompt from the kit's inputs.
pub fn build_cover_letter_prompt(
    job_card: &JobCardRow,
    resume: &ResumeRow,
    top_changes: &[TopChange],
    tone: Tone,
) -> Result<String, AppError> {
    let gaps_json = serde_json::to_string_pretty(
        &top_changes
            .iter()
            .take(5)
            .map(|c| {
                serde_json::json!({
                    "requirement": c.requirement_text,
                    "status": c.status,
                })
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow!("Failed to serialize gaps: {e}")))?;

    Ok(COVER_LETTER_PROMPT_TEMPLATE
        .replace("{tone}", tone.as_str())
        .replace("{tone_hint}", tone.style_hint())
        .replace("{company}", &job_card.company)
        .replace("{title}", &job_card.title)
        .replace("{gaps_json}", &gaps_json)
        .replace("{resume_text}", &resume.body_text))
}
