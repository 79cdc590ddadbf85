//! Handlers for the `/alerts` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use klyra_core::alert::SecurityAlert;
use klyra_core::status::AlertStatus;
use klyra_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FileAlertBody {
    pub booking_id: DbId,
    pub description: String,
    /// Reference to an uploaded screenshot, if any.
    pub screenshot_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AlertStatusBody {
    pub status: AlertStatus,
}

/// POST /api/v1/alerts
pub async fn file_alert(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<FileAlertBody>,
) -> AppResult<(StatusCode, Json<DataResponse<SecurityAlert>>)> {
    let alert = state
        .engine
        .file_alert(
            auth.user_id,
            body.booking_id,
            &body.description,
            body.screenshot_ref,
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: alert })))
}

/// GET /api/v1/alerts
pub async fn list_alerts(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<AlertQuery>,
) -> AppResult<Json<DataResponse<Vec<SecurityAlert>>>> {
    let alerts = state.engine.list_alerts(params.status).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// PUT /api/v1/alerts/{id}/status
pub async fn update_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
    Json(body): Json<AlertStatusBody>,
) -> AppResult<Json<DataResponse<SecurityAlert>>> {
    let alert = state
        .engine
        .advance_alert(alert_id, body.status, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: alert }))
}
