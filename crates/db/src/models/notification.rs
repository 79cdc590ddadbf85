//! Notification rows.

use klyra_core::error::CoreError;
use klyra_core::notification::Notification;
use klyra_core::status::{NotificationKind, StatusId};
use klyra_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::decode_status;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub user_id: DbId,
    pub booking_id: Option<DbId>,
    pub spot_id: Option<DbId>,
    pub kind_id: StatusId,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            booking_id: row.booking_id,
            spot_id: row.spot_id,
            kind: decode_status(row.kind_id, "notification kind", NotificationKind::from_id)?,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}
