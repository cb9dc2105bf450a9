use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Generated resume-improvement artifacts tied to one evidence run.
/// At most one live kit per (job card, resume, run) — regeneration
/// overwrites the whole row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationKitRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub resume_id: Uuid,
    pub evidence_run_id: Uuid,
    pub tone: String,
    pub top_changes: Value,
    pub bullet_rewrites: Value,
    pub cover_letter: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
