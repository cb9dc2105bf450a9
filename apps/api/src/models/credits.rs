#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One signed movement on a user's credit balance. The balance is the
/// running sum of `amount`; a spend is never persisted if it would drive
/// the balance negative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditLedgerRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Idempotency marker for a successfully completed metered operation.
/// Written in the same transaction as the operation's artifact, so a
/// retried request finds the marker instead of charging again.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeteredCallRow {
    pub id: Uuid,
    pub operation: String,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub artifact_id: Uuid,
    pub created_at: DateTime<Utc>,
}
