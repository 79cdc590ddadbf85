//! Handlers for `/spots` and the sensor feed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use klyra_core::overstay::SweepReport;
use klyra_core::spot::{NewSpot, ParkingSpot, SensorReading, SpotDetail, SpotOccupancy};
use klyra_core::types::{DbId, Timestamp};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireSensor};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /sensors/{sensor_id}/readings`.
#[derive(Debug, Deserialize)]
pub struct ReadingBody {
    pub obstacle: bool,
    /// Device timestamp; receipt time when omitted.
    pub updated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Spots
// ---------------------------------------------------------------------------

/// GET /api/v1/spots
pub async fn list_spots(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SpotOccupancy>>>> {
    let spots = state.engine.list_spots(Utc::now()).await?;
    Ok(Json(DataResponse { data: spots }))
}

/// POST /api/v1/spots
pub async fn create_spot(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewSpot>,
) -> AppResult<(StatusCode, Json<DataResponse<ParkingSpot>>)> {
    let spot = state.engine.create_spot(body, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: spot })))
}

/// GET /api/v1/spots/{id}/bookings
pub async fn spot_bookings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(spot_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SpotDetail>>> {
    let detail = state.engine.spot_detail(spot_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/spots/{id}/overstay-check
pub async fn check_overstay(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(spot_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SweepReport>>> {
    let report = state
        .engine
        .check_spot_overstay(spot_id, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// POST /api/v1/sensors/{sensor_id}/readings
pub async fn record_reading(
    RequireSensor(_device): RequireSensor,
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Json(body): Json<ReadingBody>,
) -> AppResult<Json<DataResponse<SensorReading>>> {
    let reading = state
        .engine
        .record_reading(&sensor_id, body.obstacle, body.updated_at, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: reading }))
}
