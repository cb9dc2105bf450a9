//! Requirement Extractor — turns a JD snapshot into a typed requirement list.
//!
//! Extraction is free (ungated) and idempotent: a successful run replaces
//! the job card's entire requirement set in one transaction.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::prompts::{EXTRACT_PROMPT_TEMPLATE, EXTRACT_SYSTEM};
use crate::llm_client::{parse_json_response, CompletionBackend};
use crate::models::jobs::{JdSnapshotRow, RequirementType};

pub mod handlers;
pub mod prompts;

/// One item of the completion's JSON array, before vocabulary filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequirement {
    pub requirement_type: String,
    pub requirement_text: String,
}

/// Extracts requirements for a job card from its newest JD snapshot and
/// replaces the stored set. Returns the new requirement count.
pub async fn extract_requirements(
    pool: &PgPool,
    backend: &dyn CompletionBackend,
    job_card_id: Uuid,
) -> Result<usize, AppError> {
    let snapshot = sqlx::query_as::<_, JdSnapshotRow>(
        "SELECT * FROM jd_snapshots WHERE job_card_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(job_card_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        AppError::validation(
            "NO_SNAPSHOT",
            "No JD snapshot saved for this job card. Capture the posting first.",
        )
    })?;

    let prompt = EXTRACT_PROMPT_TEMPLATE.replace("{jd_text}", &snapshot.jd_text);
    let response = backend
        .complete(&prompt, EXTRACT_SYSTEM)
        .await
        .map_err(|e| AppError::upstream("LLM_ERROR", format!("Requirement extraction failed: {e}")))?;

    let raw: Vec<RawRequirement> = parse_json_response(&response).map_err(|e| {
        AppError::upstream(
            "LLM_ERROR",
            format!("Requirement extraction returned unparseable output: {e}"),
        )
    })?;

    let valid = keep_valid(raw);
    if valid.is_empty() {
        return Err(AppError::upstream(
            "EXTRACTION_FAILED",
            "No valid requirements could be extracted from the JD snapshot",
        ));
    }

    // Replace, never append: the requirement set is a function of the snapshot.
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM requirements WHERE job_card_id = $1")
        .bind(job_card_id)
        .execute(&mut *tx)
        .await?;

    for (requirement_type, requirement_text) in &valid {
        sqlx::query(
            "INSERT INTO requirements (id, job_card_id, requirement_type, requirement_text) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(job_card_id)
        .bind(requirement_type.as_str())
        .bind(requirement_text)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Extracted {} requirements for job card {job_card_id} (snapshot v{})",
        valid.len(),
        snapshot.version
    );

    Ok(valid.len())
}

/// Drops items with an unknown type or empty text; the closed vocabulary
/// is the only gatekeeper between model output and persisted rows.
fn keep_valid(raw: Vec<RawRequirement>) -> Vec<(RequirementType, String)> {
    raw.into_iter()
        .filter_map(|item| {
            let ty: RequirementType = item.requirement_type.parse().ok()?;
            let text = item.requirement_text.trim();
            if text.is_empty() {
                return None;
            }
            Some((ty, text.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ty: &str, text: &str) -> RawRequirement {
        RawRequirement {
            requirement_type: ty.to_string(),
            requirement_text: text.to_string(),
        }
    }

    #[test]
    fn test_keep_valid_accepts_closed_vocabulary() {
        let items = vec![
            raw("skill", "Python"),
            raw("tool", "Docker"),
            raw("responsibility", "Own the deploy pipeline"),
            raw("softskill", "Clear written communication"),
            raw("eligibility", "2+ years experience"),
        ];
        let valid = keep_valid(items);
        assert_eq!(valid.len(), 5);
        assert_eq!(valid[0].0, RequirementType::Skill);
        assert_eq!(valid[4].0, RequirementType::Eligibility);
    }

    #[test]
    fn test_keep_valid_drops_unknown_types() {
        let items = vec![
            raw("skill", "SQL"),
            raw("vibe", "Good energy"),
            raw("certification", "AWS SAA"),
        ];
        let valid = keep_valid(items);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].1, "SQL");
    }

    #[test]
    fn test_keep_valid_drops_blank_text() {
        let items = vec![raw("skill", "   "), raw("tool", "")];
        assert!(keep_valid(items).is_empty());
    }

    #[test]
    fn test_keep_valid_trims_text() {
        let valid = keep_valid(vec![raw("skill", "  Rust  ")]);
        assert_eq!(valid[0].1, "Rust");
    }

    #[test]
    fn test_raw_requirement_deserializes_from_llm_shape() {
        let json = r#"[
            {"requirement_type": "skill", "requirement_text": "Python"},
            {"requirement_type": "eligibility", "requirement_text": "2 years experience"}
        ]"#;
        let items: Vec<RawRequirement> = serde_json::from_str(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(keep_valid(items).len(), 2);
    }
}
