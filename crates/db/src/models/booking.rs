//! Booking rows.

use klyra_core::booking::Booking;
use klyra_core::error::CoreError;
use klyra_core::status::{BookingStatus, OverstayState, StatusId};
use klyra_core::types::{DbId, Money, Timestamp};
use sqlx::FromRow;

use super::decode_status;

/// A row from the `bookings` table.
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: DbId,
    pub user_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status_id: StatusId,
    pub total_cost: Money,
    pub overstay_state_id: StatusId,
    pub overstay_penalty: Option<Money>,
    pub pending_debt: Option<Money>,
    pub reassigned_from: Option<DbId>,
    pub arrived_at: Option<Timestamp>,
    pub start_validated_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            spot_id: row.spot_id,
            vehicle_number: row.vehicle_number,
            start_time: row.start_time,
            end_time: row.end_time,
            status: decode_status(row.status_id, "booking status", BookingStatus::from_id)?,
            total_cost: row.total_cost,
            overstay_state: decode_status(
                row.overstay_state_id,
                "overstay state",
                OverstayState::from_id,
            )?,
            overstay_penalty: row.overstay_penalty,
            pending_debt: row.pending_debt,
            reassigned_from: row.reassigned_from,
            arrived_at: row.arrived_at,
            start_validated_at: row.start_validated_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first undecodable one.
pub fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, CoreError> {
    rows.into_iter().map(Booking::try_from).collect()
}
