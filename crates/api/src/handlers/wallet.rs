//! Handlers for the `/wallet` resource.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use klyra_core::money::format_inr;
use klyra_core::notification::pending_debt_reminder;
use klyra_core::types::Money;
use klyra_core::wallet::{CreditReceipt, Transaction, WalletAccount};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default number of ledger rows returned by `GET /wallet/transactions`.
const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TopUpBody {
    pub amount: Money,
}

#[derive(Debug, Serialize)]
pub struct PendingDebt {
    pub pending_debt: Money,
    /// Display form, e.g. `₹120.00`.
    pub formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<String>,
}

/// GET /api/v1/wallet
pub async fn get_wallet(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<WalletAccount>>> {
    let wallet = state.engine.wallet(auth.user_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: wallet }))
}

/// GET /api/v1/wallet/transactions
pub async fn list_transactions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<Transaction>>>> {
    let rows = state
        .engine
        .transactions(auth.user_id, params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/wallet/pending-debt
pub async fn pending_debt(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PendingDebt>>> {
    let debt = state.engine.check_pending_debt(auth.user_id).await?;
    let reminder = (debt > Money::ZERO).then(|| pending_debt_reminder(debt));
    Ok(Json(DataResponse {
        data: PendingDebt {
            pending_debt: debt,
            formatted: format_inr(debt),
            reminder,
        },
    }))
}

/// POST /api/v1/wallet/top-up
pub async fn top_up(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<TopUpBody>,
) -> AppResult<Json<DataResponse<CreditReceipt>>> {
    let receipt = state
        .engine
        .top_up(auth.user_id, body.amount, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: receipt }))
}
