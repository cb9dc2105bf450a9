use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The four generated messages for a job card. Latest generation replaces
/// the prior row wholesale — no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutreachPackRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub recruiter_email: String,
    pub linkedin_dm: String,
    pub follow_up_1: String,
    pub follow_up_2: String,
    pub created_at: DateTime<Utc>,
}

/// A user-supplied snippet used to add bounded context to outreach
/// generation. Requires a URL or 50–5000 chars of pasted text; at most 5
/// per job card.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonalizationSourceRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub source_type: String,
    pub url: Option<String>,
    pub pasted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}
