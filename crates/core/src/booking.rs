//! Bookings: request validation, pricing, and the buffered-window rule.
//!
//! Two active bookings on the same spot must keep their buffered intervals
//! `[start - 30min, end + 30min)` disjoint. Every store command that places a
//! booking on a spot (create, extend, reassign) checks [`windows_conflict`]
//! inside its atomic unit.

use chrono::{Duration, Months};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::policy::{
    booking_buffer, EnginePolicy, MAX_ADVANCE_MONTHS, MAX_BOOKING_DAYS, MAX_BOOKING_HOURS,
    MAX_EXTENSION_HOURS, MIN_BOOKING_DAYS, MIN_BOOKING_HOURS, MIN_EXTENSION_HOURS,
};
use crate::status::{BookingStatus, OverstayState};
use crate::types::{DbId, Money, Timestamp};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A reservation of one spot for a half-open window `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: DbId,
    pub user_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status: BookingStatus,
    pub total_cost: Money,
    pub overstay_state: OverstayState,
    pub overstay_penalty: Option<Money>,
    /// Shortfall of this booking's penalty carried to the user's wallet.
    pub pending_debt: Option<Money>,
    /// Original spot when the engine moved the booking.
    pub reassigned_from: Option<DbId>,
    pub arrived_at: Option<Timestamp>,
    pub start_validated_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// Whether `now` falls inside the booked window.
    pub fn covers(&self, now: Timestamp) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn has_ended(&self, now: Timestamp) -> bool {
        self.end_time <= now
    }

    /// Whether this booking's buffered interval overlaps `[start, end)` buffered.
    pub fn conflicts_with(&self, start: Timestamp, end: Timestamp) -> bool {
        windows_conflict(self.start_time, self.end_time, start, end)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Requested length of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum BookingDuration {
    Hours(i64),
    Days(i64),
}

impl BookingDuration {
    pub fn to_duration(self) -> Duration {
        match self {
            BookingDuration::Hours(h) => Duration::hours(h),
            BookingDuration::Days(d) => Duration::days(d),
        }
    }

    fn validate(self) -> Result<(), CoreError> {
        match self {
            BookingDuration::Hours(h) if !(MIN_BOOKING_HOURS..=MAX_BOOKING_HOURS).contains(&h) => {
                Err(CoreError::Validation(format!(
                    "Duration must be between {MIN_BOOKING_HOURS} and {MAX_BOOKING_HOURS} hours"
                )))
            }
            BookingDuration::Days(d) if !(MIN_BOOKING_DAYS..=MAX_BOOKING_DAYS).contains(&d) => {
                Err(CoreError::Validation(format!(
                    "Duration must be between {MIN_BOOKING_DAYS} and {MAX_BOOKING_DAYS} days"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A user's request to reserve a spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub user_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub start_time: Timestamp,
    pub duration: BookingDuration,
}

/// Store command inserting a priced, validated booking.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub total_cost: Money,
    /// The spot was checked against a live sensor at creation time.
    pub start_validated: bool,
}

/// Result of extending an active booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionReceipt {
    pub booking_id: DbId,
    pub cost: Money,
    pub new_end_time: Timestamp,
    pub extension_hours: i64,
}

/// Trim and upper-case a vehicle registration number.
pub fn normalize_vehicle_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Validate a booking request against `now` and price it.
///
/// The returned command still needs the imminent-start sensor check
/// (`start_validated`) decided by the caller.
pub fn prepare_booking(
    request: &BookingRequest,
    policy: &EnginePolicy,
    now: Timestamp,
) -> Result<NewBooking, CoreError> {
    let vehicle_number = normalize_vehicle_number(&request.vehicle_number);
    if vehicle_number.is_empty() {
        return Err(CoreError::Validation(
            "Vehicle number is required".to_string(),
        ));
    }

    if request.start_time < now {
        return Err(CoreError::Validation(
            "Start time cannot be in the past".to_string(),
        ));
    }

    let latest_start = now
        .checked_add_months(Months::new(MAX_ADVANCE_MONTHS))
        .ok_or_else(|| CoreError::Internal("Advance booking limit overflowed".to_string()))?;
    if request.start_time > latest_start {
        return Err(CoreError::Validation(
            "Bookings can only be made up to 1 month in advance".to_string(),
        ));
    }

    request.duration.validate()?;

    let duration = request.duration.to_duration();
    Ok(NewBooking {
        user_id: request.user_id,
        spot_id: request.spot_id,
        vehicle_number,
        start_time: request.start_time,
        end_time: request.start_time + duration,
        total_cost: policy.booking_cost(duration),
        start_validated: false,
    })
}

/// Whether a booking starting at `start` is close enough to `now` to be
/// checked against the live sensor.
pub fn is_imminent(start: Timestamp, now: Timestamp) -> bool {
    start - now <= crate::policy::imminent_window()
}

pub fn validate_extension_hours(hours: i64) -> Result<(), CoreError> {
    if !(MIN_EXTENSION_HOURS..=MAX_EXTENSION_HOURS).contains(&hours) {
        return Err(CoreError::Validation(format!(
            "Extension must be between {MIN_EXTENSION_HOURS} and {MAX_EXTENSION_HOURS} hours"
        )));
    }
    Ok(())
}

/// Whether an active booking may still be extended.
pub fn ensure_extendable(booking: &Booking) -> Result<(), CoreError> {
    if !booking.is_active() {
        return Err(CoreError::Validation(format!(
            "Booking {} is {} and cannot be extended",
            booking.id, booking.status
        )));
    }
    match booking.overstay_state {
        OverstayState::OnTime | OverstayState::Overstaying => Ok(()),
        state => Err(CoreError::Validation(format!(
            "Booking {} is {state} and cannot be extended",
            booking.id
        ))),
    }
}

// ---------------------------------------------------------------------------
// Buffered windows
// ---------------------------------------------------------------------------

/// The window widened by the booking buffer on both sides.
pub fn buffered_window(start: Timestamp, end: Timestamp) -> (Timestamp, Timestamp) {
    (start - booking_buffer(), end + booking_buffer())
}

/// Whether two windows collide once both are buffered (half-open intervals).
pub fn windows_conflict(
    a_start: Timestamp,
    a_end: Timestamp,
    b_start: Timestamp,
    b_end: Timestamp,
) -> bool {
    let (a_lo, a_hi) = buffered_window(a_start, a_end);
    let (b_lo, b_hi) = buffered_window(b_start, b_end);
    a_lo < b_hi && b_lo < a_hi
}

/// First active booking in `existing` that collides with `[start, end)`,
/// ignoring `exclude` (the booking being moved or extended).
pub fn find_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Booking>,
    start: Timestamp,
    end: Timestamp,
    exclude: Option<DbId>,
) -> Option<&'a Booking> {
    existing
        .into_iter()
        .filter(|b| b.is_active() && Some(b.id) != exclude)
        .find(|b| b.conflicts_with(start, end))
}
