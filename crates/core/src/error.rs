use crate::money::format_inr;
use crate::types::{DbId, Money};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Buffered booking windows overlap on the same spot.
    #[error("Booking conflict: {0}")]
    BookingConflict(String),

    /// A unique value already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(
        "Insufficient balance: you need {} but have {}",
        format_inr(*.required),
        format_inr(*.available)
    )]
    InsufficientBalance { required: Money, available: Money },

    #[error("Spot {spot_number} is currently occupied (sensor detected a vehicle)")]
    SpotOccupied { spot_number: String },

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon is no longer active: {0}")]
    CouponInactive(String),

    #[error("Coupon has reached its usage limit: {0}")]
    CouponExhausted(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage or network unavailable; callers may retry.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Conflict raised when a booking window collides with another on the same spot.
    pub fn slot_conflict(spot_number: &str) -> Self {
        CoreError::BookingConflict(format!(
            "Spot {spot_number} is already booked for the selected time \
             (including 30-minute buffer). Please choose a different time or spot."
        ))
    }

    /// Whether the failure is worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }
}
