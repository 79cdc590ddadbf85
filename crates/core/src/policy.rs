//! Pricing and timing policy for the parking engine.
//!
//! The rates and the cross-location flag are configurable at startup; the
//! timing windows below are fixed constants shared by every component.

use chrono::Duration;
use rust_decimal::Decimal;

use crate::money::{round_money, rupees};
use crate::types::Money;

// ---------------------------------------------------------------------------
// Fixed timing constants
// ---------------------------------------------------------------------------

/// Buffer kept free on both sides of every active booking on a spot.
pub const BOOKING_BUFFER_MINUTES: i64 = 30;

/// Overstay tolerated after `end_time` before a resolution is applied.
/// A delay of exactly this many minutes is still inside the grace period.
pub const OVERSTAY_GRACE_MINUTES: i64 = 5;

/// Maximum age of a sensor reading that is still trusted.
pub const SENSOR_FRESHNESS_MINUTES: i64 = 2;

/// Bookings starting within this window are checked against the live sensor.
pub const IMMINENT_START_MINUTES: i64 = 5;

/// How far ahead a booking may start, in calendar months.
pub const MAX_ADVANCE_MONTHS: u32 = 1;

/// Allowed booking duration bounds.
pub const MIN_BOOKING_HOURS: i64 = 1;
pub const MAX_BOOKING_HOURS: i64 = 24;
pub const MIN_BOOKING_DAYS: i64 = 1;
pub const MAX_BOOKING_DAYS: i64 = 28;

/// Allowed extension bounds, in hours.
pub const MIN_EXTENSION_HOURS: i64 = 1;
pub const MAX_EXTENSION_HOURS: i64 = 24;

/// Smallest accepted wallet top-up and gift coupon, in rupees.
pub const MIN_TOP_UP: i64 = 50;
pub const MIN_GIFT_AMOUNT: i64 = 50;

pub fn booking_buffer() -> Duration {
    Duration::minutes(BOOKING_BUFFER_MINUTES)
}

pub fn overstay_grace() -> Duration {
    Duration::minutes(OVERSTAY_GRACE_MINUTES)
}

pub fn sensor_freshness() -> Duration {
    Duration::minutes(SENSOR_FRESHNESS_MINUTES)
}

pub fn imminent_window() -> Duration {
    Duration::minutes(IMMINENT_START_MINUTES)
}

// ---------------------------------------------------------------------------
// Configurable policy
// ---------------------------------------------------------------------------

/// Rates and switches the engine reads on every decision.
#[derive(Debug, Clone, PartialEq)]
pub struct EnginePolicy {
    /// Booking and extension price per hour.
    pub hourly_rate: Money,
    /// Penalty per started hour of overstay.
    pub overstay_hourly_rate: Money,
    /// Flat credit paid to a user whose booking was cancelled by the engine.
    pub cancellation_compensation: Money,
    /// Allow displaced bookings to move to another location when the
    /// original location has no free spot.
    pub reassign_across_locations: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            hourly_rate: rupees(50),
            overstay_hourly_rate: rupees(100),
            cancellation_compensation: rupees(50),
            reassign_across_locations: false,
        }
    }
}

impl EnginePolicy {
    /// Price of a window, pro-rated linearly by the minute.
    pub fn booking_cost(&self, duration: Duration) -> Money {
        let minutes = Decimal::from(duration.num_minutes());
        round_money(minutes * self.hourly_rate / Decimal::from(60))
    }

    /// Price of an extension by whole hours.
    pub fn extension_cost(&self, hours: i64) -> Money {
        round_money(Decimal::from(hours) * self.hourly_rate)
    }

    /// Penalty for an overstay: every started hour is charged in full.
    ///
    /// Returns zero for a non-positive overstay.
    pub fn overstay_penalty(&self, overstay: Duration) -> Money {
        let minutes = overstay.num_minutes();
        if overstay <= Duration::zero() {
            return Decimal::ZERO;
        }
        // Sub-minute overstays still count as one started hour.
        let started_hours = (minutes.max(1) + 59) / 60;
        round_money(Decimal::from(started_hours) * self.overstay_hourly_rate)
    }
}
