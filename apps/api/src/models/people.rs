use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Work-authorization and pack-selection fields from the profile store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub region: String,
    pub track: String,
    pub work_authorization: Option<String>,
    pub needs_sponsorship: Option<bool>,
}

/// Plain-text resume from the resume store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub body_text: String,
    pub created_at: DateTime<Utc>,
}

/// Recruiter or hiring-manager contact attached to a job card.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
