//! Credit ledger gate — debit-before-call, refund-on-failure.
//!
//! The ledger is the one shared mutable resource in the system. Every
//! balance read-then-write runs under a per-user transaction-scoped
//! advisory lock, so two concurrent generations can never both observe a
//! stale sufficient balance.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::credits::MeteredCallRow;

pub mod handlers;
pub mod rate_limit;

pub const SCAN_COST: i64 = 1;
pub const OUTREACH_COST: i64 = 1;
pub const BATCH_SPRINT_COST: i64 = 5;

/// Current balance: the running sum of ledger amounts.
pub async fn balance(pool: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
    let balance: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM credit_ledger WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(balance)
}

/// Debits `amount` credits from the user, failing with
/// `INSUFFICIENT_CREDITS` if the balance cannot cover it.
///
/// The check and the insert run in one transaction holding
/// `pg_advisory_xact_lock` on the user id, which serializes concurrent
/// spends for that user without locking anyone else out.
pub async fn charge(
    pool: &PgPool,
    user_id: Uuid,
    amount: i64,
    reason: &str,
) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let balance: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM credit_ledger WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if balance < amount {
        return Err(AppError::InsufficientCredits {
            balance,
            required: amount,
        });
    }

    let entry_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO credit_ledger (id, user_id, amount, reason) VALUES ($1, $2, $3, $4)",
    )
    .bind(entry_id)
    .bind(user_id)
    .bind(-amount)
    .bind(reason)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Debited {amount} credit(s) from user {user_id}: {reason}");
    Ok(entry_id)
}

/// Credits `amount` back to the user. Used on any failure after a debit.
pub async fn refund(
    pool: &PgPool,
    user_id: Uuid,
    amount: i64,
    reason: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO credit_ledger (id, user_id, amount, reason) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(amount)
    .bind(reason)
    .execute(pool)
    .await?;

    info!("Refunded {amount} credit(s) to user {user_id}: {reason}");
    Ok(())
}

/// Refund that must not mask the original failure. If the refund itself
/// fails we log loudly; the ledger invariant is restored by ops from the
/// log line.
pub async fn refund_or_log(pool: &PgPool, user_id: Uuid, amount: i64, reason: &str) {
    if let Err(e) = refund(pool, user_id, amount, reason).await {
        error!(
            "REFUND FAILED for user {user_id}, amount {amount}, reason '{reason}': {e}. \
             Manual ledger correction required."
        );
    }
}

/// Looks up a previously completed metered call by its client-supplied
/// request id. A hit means the operation already succeeded and charged;
/// the caller returns the stored artifact instead of re-running.
pub async fn find_completed_call(
    pool: &PgPool,
    operation: &str,
    request_id: Uuid,
) -> Result<Option<MeteredCallRow>, AppError> {
    let row = sqlx::query_as::<_, MeteredCallRow>(
        "SELECT * FROM metered_calls WHERE operation = $1 AND request_id = $2",
    )
    .bind(operation)
    .bind(request_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Records the success marker inside the caller's artifact transaction, so
/// the debit-and-artifact pair commits as one logical unit.
pub async fn record_completed_call(
    tx: &mut Transaction<'_, Postgres>,
    operation: &str,
    request_id: Uuid,
    user_id: Uuid,
    artifact_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO metered_calls (id, operation, request_id, user_id, artifact_id) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(operation)
    .bind(request_id)
    .bind(user_id)
    .bind(artifact_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
