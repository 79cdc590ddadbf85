//! On-demand run of the background monitors.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use klyra_core::overstay::SweepReport;
use serde::Serialize;

use crate::engine::StartValidation;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MonitorRun {
    pub overstay: SweepReport,
    pub start_validations: Vec<StartValidation>,
}

/// POST /api/v1/monitor/sweep
///
/// Run one overstay sweep followed by one start-validation pass.
pub async fn sweep(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MonitorRun>>> {
    let now = Utc::now();
    let overstay = state.engine.run_overstay_sweep(now).await?;
    let start_validations = state.engine.validate_upcoming_starts(now).await?;
    tracing::info!(
        admin_id = admin.user_id,
        processed = overstay.processed_count,
        validated = start_validations.len(),
        "Manual monitor run",
    );
    Ok(Json(DataResponse {
        data: MonitorRun {
            overstay,
            start_validations,
        },
    }))
}
