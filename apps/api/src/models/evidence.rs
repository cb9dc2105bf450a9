use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of a scoring pass. A run only ever lands in the table as
/// `completed` — failures commit nothing — but the vocabulary covers the
/// full lifecycle for API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// Per-requirement verdict from the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Matched,
    Partial,
    Missing,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Matched => "matched",
            ItemStatus::Partial => "partial",
            ItemStatus::Missing => "missing",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "matched" => Ok(ItemStatus::Matched),
            "partial" => Ok(ItemStatus::Partial),
            "missing" => Ok(ItemStatus::Missing),
            other => Err(format!("unknown item status '{other}'")),
        }
    }
}

/// One scoring pass for (job card, resume).
/// `score_breakdown` holds the serialized four-category breakdown plus
/// eligibility flags; `pack_region`/`pack_track` record which pack priced it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvidenceRunRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub resume_id: Uuid,
    pub status: String,
    pub overall_score: i32,
    pub score_breakdown: Value,
    pub pack_region: String,
    pub pack_track: String,
    pub created_at: DateTime<Utc>,
}

/// One row per requirement active at run creation. For any completed run,
/// the item count equals the requirement count as of that moment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvidenceItemRow {
    pub id: Uuid,
    pub run_id: Uuid,
    pub requirement_id: Uuid,
    pub status: String,
    pub resume_proof: String,
    pub fix: String,
    pub rewrite_a: String,
    pub rewrite_b: String,
    pub why_it_matters: String,
    /// True when a rewrite asserts a claim the resume proof does not support.
    pub needs_confirmation: bool,
    pub group_type: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only score timeline per (job card, resume).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreHistoryRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub resume_id: Uuid,
    pub run_id: Uuid,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchSprintRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub fee: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchSprintItemRow {
    pub id: Uuid,
    pub sprint_id: Uuid,
    pub job_card_id: Uuid,
    pub run_id: Option<Uuid>,
    pub score: Option<i32>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}
