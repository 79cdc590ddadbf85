//! Data-access seam between the engine and persistence.
//!
//! Every method is one atomic unit: it either applies completely or leaves
//! the store untouched. Commands that act on state the engine read earlier
//! are compare-and-set: when the state moved in between they report a lost
//! race (`false` / `None`) instead of failing, and the caller re-plans on the
//! next tick.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alert::{NewAlert, SecurityAlert};
use crate::booking::{Booking, ExtensionReceipt, NewBooking};
use crate::coupon::{Coupon, NewCoupon};
use crate::error::CoreError;
use crate::notification::{NewNotification, Notification};
use crate::spot::{NewSpot, ParkingSpot, SensorReading};
use crate::status::{AlertStatus, OverstayState};
use crate::types::{DbId, Money, Timestamp};
use crate::wallet::{ChargeSplit, CreditReceipt, Transaction, WalletAccount};

pub type StoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// What happens to a booking pushed off its spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Displacement {
    /// Move to `to_spot_id` keeping window and cost; `reassigned_from` is set
    /// to `from_spot_id`.
    Reassign {
        booking_id: DbId,
        from_spot_id: DbId,
        to_spot_id: DbId,
    },
    /// Cancel and credit `refund` and `compensation` as two ledger rows.
    Cancel {
        booking_id: DbId,
        from_spot_id: DbId,
        refund: Money,
        compensation: Money,
    },
}

impl Displacement {
    pub fn booking_id(&self) -> DbId {
        match self {
            Displacement::Reassign { booking_id, .. } | Displacement::Cancel { booking_id, .. } => {
                *booking_id
            }
        }
    }
}

/// Resolve an overstay: charge the penalty, displace blocked bookings, and
/// move the overstayer to `final_state`, all in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct OverstayResolution {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub spot_id: DbId,
    pub penalty: Money,
    pub overstay_minutes: i64,
    pub cascade: Vec<Displacement>,
    pub final_state: OverstayState,
    /// Notices for the displaced users. The penalty notice is built by the
    /// store once the balance split is known.
    pub notifications: Vec<NewNotification>,
}

/// Displace bookings still blocked by an overstayer whose penalty was already
/// charged. No ledger row is written for the overstayer.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpCascade {
    pub overstayer_id: DbId,
    pub spot_id: DbId,
    pub cascade: Vec<Displacement>,
    pub notifications: Vec<NewNotification>,
}

/// Store command for a booking-start check.
#[derive(Debug, Clone, PartialEq)]
pub struct StartCheck {
    pub booking_id: DbId,
    /// Spot the engine saw the booking on.
    pub expected_spot_id: DbId,
    /// `None` marks the booking validated in place.
    pub displacement: Option<Displacement>,
    pub notifications: Vec<NewNotification>,
}

/// Extension request handed to the store after hour validation and pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionCommand {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub hours: i64,
    pub cost: Money,
}

/// Penalty settlement reported after a successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyOutcome {
    pub charge: ChargeSplit,
    pub pending_debt: Money,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ParkingStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // -- spots & sensors ----------------------------------------------------

    async fn insert_spot(&self, spot: NewSpot, now: Timestamp) -> StoreResult<ParkingSpot>;
    async fn list_spots(&self) -> StoreResult<Vec<ParkingSpot>>;
    async fn find_spot(&self, id: DbId) -> StoreResult<Option<ParkingSpot>>;

    /// Upsert the latest reading for a sensor.
    async fn record_reading(&self, reading: SensorReading) -> StoreResult<SensorReading>;
    async fn find_reading(&self, sensor_id: &str) -> StoreResult<Option<SensorReading>>;
    async fn list_readings(&self) -> StoreResult<Vec<SensorReading>>;

    /// Recompute `is_available` for every spot. Returns the number of spots
    /// whose flag changed.
    async fn refresh_availability(&self, now: Timestamp) -> StoreResult<u64>;

    // -- bookings -----------------------------------------------------------

    async fn find_booking(&self, id: DbId) -> StoreResult<Option<Booking>>;
    /// Newest first.
    async fn list_bookings_for_user(
        &self,
        user_id: DbId,
        active_only: bool,
    ) -> StoreResult<Vec<Booking>>;
    /// Bookings of any status on one spot ordered by `start_time`.
    async fn list_bookings_for_spot(&self, spot_id: DbId) -> StoreResult<Vec<Booking>>;
    /// Active bookings on one spot ordered by `start_time`.
    async fn active_bookings_for_spot(&self, spot_id: DbId) -> StoreResult<Vec<Booking>>;
    async fn list_active_bookings(&self) -> StoreResult<Vec<Booking>>;
    /// Active, unvalidated bookings starting in `[from, to]`.
    async fn bookings_pending_start_validation(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> StoreResult<Vec<Booking>>;

    /// Insert a booking and debit its cost. Fails with `NotFound`,
    /// `Conflict` or `InsufficientBalance` without writing anything.
    async fn commit_booking(&self, booking: NewBooking, now: Timestamp) -> StoreResult<Booking>;

    /// Extend an active booking owned by the caller and debit the cost.
    async fn commit_extension(
        &self,
        command: ExtensionCommand,
        now: Timestamp,
    ) -> StoreResult<ExtensionReceipt>;

    /// Set `arrived_at` if the booking is active and not yet arrived.
    async fn record_arrival(&self, booking_id: DbId, at: Timestamp) -> StoreResult<bool>;

    /// Compare-and-set the overstay state.
    async fn transition_overstay(
        &self,
        booking_id: DbId,
        from: OverstayState,
        to: OverstayState,
        now: Timestamp,
    ) -> StoreResult<bool>;

    /// Apply a start check if the booking is still active, unvalidated, and
    /// on the expected spot.
    async fn validate_start(&self, check: StartCheck, now: Timestamp) -> StoreResult<bool>;

    /// Apply an overstay resolution. `None` when any part of the unit lost a
    /// race; nothing is written in that case.
    async fn resolve_overstay(
        &self,
        resolution: OverstayResolution,
        now: Timestamp,
    ) -> StoreResult<Option<PenaltyOutcome>>;

    /// Apply a follow-up cascade if the overstayer is still active, resolved,
    /// and on the spot. `false` when any displacement lost a race; nothing is
    /// written in that case.
    async fn displace_blocked(&self, cascade: FollowUpCascade, now: Timestamp)
        -> StoreResult<bool>;

    /// Complete an active booking. Returns the owner's pending debt, or
    /// `None` if the booking was no longer active.
    async fn complete_booking(&self, booking_id: DbId, now: Timestamp)
        -> StoreResult<Option<Money>>;

    // -- wallet & coupons ---------------------------------------------------

    async fn find_wallet(&self, user_id: DbId) -> StoreResult<Option<WalletAccount>>;
    /// Newest first.
    async fn list_transactions(&self, user_id: DbId, limit: i64) -> StoreResult<Vec<Transaction>>;
    async fn top_up(&self, user_id: DbId, amount: Money, now: Timestamp)
        -> StoreResult<CreditReceipt>;

    async fn insert_coupon(&self, coupon: NewCoupon, now: Timestamp) -> StoreResult<Coupon>;
    async fn find_coupon(&self, code: &str) -> StoreResult<Option<Coupon>>;
    /// Check, consume and credit a coupon. `code` is already normalized.
    async fn redeem_coupon(
        &self,
        user_id: DbId,
        code: &str,
        now: Timestamp,
    ) -> StoreResult<CreditReceipt>;

    // -- notifications ------------------------------------------------------

    async fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: DbId, id: DbId) -> StoreResult<bool>;

    // -- security alerts ----------------------------------------------------

    async fn insert_alert(&self, alert: NewAlert, now: Timestamp) -> StoreResult<SecurityAlert>;
    async fn find_alert(&self, id: DbId) -> StoreResult<Option<SecurityAlert>>;
    async fn list_alerts(&self, status: Option<AlertStatus>) -> StoreResult<Vec<SecurityAlert>>;
    /// Compare-and-set the alert status.
    async fn update_alert_status(
        &self,
        id: DbId,
        from: AlertStatus,
        to: AlertStatus,
        now: Timestamp,
    ) -> StoreResult<bool>;
}
