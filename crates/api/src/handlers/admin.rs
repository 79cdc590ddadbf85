//! Admin dashboard reads.

use axum::extract::State;
use axum::Json;
use klyra_core::spot::DashboardStats;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/stats
pub async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardStats>>> {
    let stats = state.engine.dashboard_stats().await?;
    Ok(Json(DataResponse { data: stats }))
}
