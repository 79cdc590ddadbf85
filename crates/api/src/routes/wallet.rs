//! Route definitions for the `/wallet` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::wallet;
use crate::state::AppState;

/// Routes mounted at `/wallet`.
///
/// ```text
/// GET    /                -> get_wallet
/// GET    /transactions    -> list_transactions
/// GET    /pending-debt    -> pending_debt
/// POST   /top-up          -> top_up
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(wallet::get_wallet))
        .route("/transactions", get(wallet::list_transactions))
        .route("/pending-debt", get(wallet::pending_debt))
        .route("/top-up", post(wallet::top_up))
}
