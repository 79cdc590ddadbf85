//! Handlers for the `/bookings` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use klyra_core::booking::{Booking, BookingDuration, BookingRequest, ExtensionReceipt};
use klyra_core::types::{DbId, Timestamp};
use serde::Deserialize;

use crate::engine::StartValidation;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /bookings`.
#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub start_time: Timestamp,
    /// `{ "unit": "hours" | "days", "value": n }`
    pub duration: BookingDuration,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendBookingBody {
    pub hours: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/bookings
pub async fn create_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateBookingBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Booking>>)> {
    let request = BookingRequest {
        user_id: auth.user_id,
        spot_id: body.spot_id,
        vehicle_number: body.vehicle_number,
        start_time: body.start_time,
        duration: body.duration,
    };
    let booking = state.engine.create_booking(request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: booking })))
}

/// GET /api/v1/bookings
///
/// The caller's bookings, newest first.
pub async fn list_bookings(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListBookingsQuery>,
) -> AppResult<Json<DataResponse<Vec<Booking>>>> {
    let bookings = state
        .store
        .list_bookings_for_user(auth.user_id, params.active_only.unwrap_or(false))
        .await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let booking = state
        .engine
        .booking_for(auth.user_id, auth.is_admin(), booking_id)
        .await?;
    Ok(Json(DataResponse { data: booking }))
}

/// POST /api/v1/bookings/{id}/extend
pub async fn extend_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
    Json(body): Json<ExtendBookingBody>,
) -> AppResult<Json<DataResponse<ExtensionReceipt>>> {
    let receipt = state
        .engine
        .extend_booking(auth.user_id, booking_id, body.hours, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: receipt }))
}

/// POST /api/v1/bookings/{id}/validate-start
///
/// Run the start check for one booking now instead of waiting for the monitor.
pub async fn validate_start(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
) -> AppResult<Json<DataResponse<StartValidation>>> {
    let result = state
        .engine
        .validate_booking_start(booking_id, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: result }))
}
