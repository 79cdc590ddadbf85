//! Security alert rows.

use klyra_core::alert::SecurityAlert;
use klyra_core::error::CoreError;
use klyra_core::status::{AlertStatus, StatusId};
use klyra_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::decode_status;

/// A row from the `security_alerts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: DbId,
    pub user_id: DbId,
    pub booking_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub description: String,
    pub screenshot_ref: Option<String>,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AlertRow> for SecurityAlert {
    type Error = CoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(SecurityAlert {
            id: row.id,
            user_id: row.user_id,
            booking_id: row.booking_id,
            spot_id: row.spot_id,
            vehicle_number: row.vehicle_number,
            description: row.description,
            screenshot_ref: row.screenshot_ref,
            status: decode_status(row.status_id, "alert status", AlertStatus::from_id)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
