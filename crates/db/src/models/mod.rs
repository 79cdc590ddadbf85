//! Row types for `sqlx::FromRow` and their conversion into domain types.
//!
//! Status and kind columns are stored as SMALLINT lookup IDs; converting a
//! row fails with [`CoreError::Internal`](klyra_core::error::CoreError) when
//! an ID has no matching enum variant.

pub mod alert;
pub mod booking;
pub mod coupon;
pub mod notification;
pub mod spot;
pub mod wallet;

use klyra_core::error::CoreError;
use klyra_core::status::StatusId;

/// Decode a lookup-table ID into its enum, naming the column on failure.
pub(crate) fn decode_status<T>(
    id: StatusId,
    column: &'static str,
    from_id: fn(StatusId) -> Option<T>,
) -> Result<T, CoreError> {
    from_id(id).ok_or_else(|| CoreError::Internal(format!("Unknown {column} {id}")))
}
