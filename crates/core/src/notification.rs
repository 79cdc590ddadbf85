//! User notices written by the engine alongside the mutation they describe.
//!
//! At most one notice of each kind exists per booking and spot; stores
//! enforce the `(booking_id, kind, spot_id)` uniqueness so replays never
//! duplicate a message while a second move of the same booking still gets
//! its own notice.

use serde::{Deserialize, Serialize};

use crate::money::format_inr;
use crate::spot::ParkingSpot;
use crate::status::NotificationKind;
use crate::types::{DbId, Money, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub booking_id: Option<DbId>,
    /// Spot the notice points the user to, set on reassignment notices.
    pub spot_id: Option<DbId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: DbId,
    pub booking_id: Option<DbId>,
    pub spot_id: Option<DbId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

/// Why a booking was moved or cancelled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplacementCause {
    /// The previous booking on the spot overstayed.
    PreviousOverstay,
    /// The spot was occupied when the booking was about to start.
    SpotOccupied,
}

pub fn reassigned_notice(
    user_id: DbId,
    booking_id: DbId,
    new_spot: &ParkingSpot,
    cause: DisplacementCause,
) -> NewNotification {
    let new_spot_number = &new_spot.spot_number;
    let message = match cause {
        DisplacementCause::PreviousOverstay => format!(
            "Your booking has been reassigned to Spot {new_spot_number} due to a previous \
             booking overstay. No additional charges apply."
        ),
        DisplacementCause::SpotOccupied => format!(
            "Your booking has been reassigned to Spot {new_spot_number} because the original \
             spot was occupied."
        ),
    };
    NewNotification {
        user_id,
        booking_id: Some(booking_id),
        spot_id: Some(new_spot.id),
        kind: NotificationKind::BookingReassigned,
        title: "Booking Reassigned".to_string(),
        message,
    }
}

pub fn cancelled_notice(
    user_id: DbId,
    booking_id: DbId,
    refund: Money,
    compensation: Money,
    cause: DisplacementCause,
) -> NewNotification {
    let (refund, compensation) = (format_inr(refund), format_inr(compensation));
    let message = match cause {
        DisplacementCause::PreviousOverstay => format!(
            "Your booking has been cancelled due to a previous booking overstay. You will \
             receive a full refund of {refund} plus {compensation} compensation."
        ),
        DisplacementCause::SpotOccupied => format!(
            "Your booking was cancelled because the spot was occupied. You received a refund \
             of {refund} plus {compensation} compensation."
        ),
    };
    NewNotification {
        user_id,
        booking_id: Some(booking_id),
        spot_id: None,
        kind: NotificationKind::BookingCancelled,
        title: "Booking Cancelled".to_string(),
        message,
    }
}

pub fn penalty_notice(
    user_id: DbId,
    booking_id: DbId,
    overstay_minutes: i64,
    penalty: Money,
    added_to_debt: Money,
) -> NewNotification {
    let mut message = format!(
        "You overstayed your booking by {overstay_minutes} minutes. An overstay penalty of {} \
         has been charged.",
        format_inr(penalty)
    );
    if !added_to_debt.is_zero() {
        message.push_str(&format!(
            " {} could not be covered by your balance and was added to your pending debt.",
            format_inr(added_to_debt)
        ));
    }
    NewNotification {
        user_id,
        booking_id: Some(booking_id),
        spot_id: None,
        kind: NotificationKind::OverstayPenalty,
        title: "Overstay Penalty".to_string(),
        message,
    }
}

/// Written on completion only when the user still owes money.
pub fn completed_with_debt_notice(
    user_id: DbId,
    booking_id: DbId,
    pending_debt: Money,
) -> NewNotification {
    NewNotification {
        user_id,
        booking_id: Some(booking_id),
        spot_id: None,
        kind: NotificationKind::BookingCompleted,
        title: "Booking Completed".to_string(),
        message: format!(
            "Your booking has ended. You have a pending debt of {} from overstay charges.",
            format_inr(pending_debt)
        ),
    }
}

/// Reminder text shown when a user with debt checks their wallet.
pub fn pending_debt_reminder(pending_debt: Money) -> String {
    format!(
        "You have a pending debt of {} from overstay charges. This will be deducted from your \
         next top-up.",
        format_inr(pending_debt)
    )
}
