//! Axum route handlers for the credit ledger.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

/// GET /api/v1/credits/balance
pub async fn handle_balance(
    State(state): State<AppState>,
    Query(params): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = super::balance(&state.db, params.user_id).await?;
    Ok(Json(BalanceResponse { balance }))
}
