//! Overstay state machine and the per-spot sweep decisions.
//!
//! A booking whose window has ended while its vehicle is still on the spot
//! moves `on_time -> overstaying`. Once the overstay exceeds the grace period
//! it is resolved (penalty, plus reassignment or cancellation of whoever was
//! queued behind it) and finally `completed` when the spot is vacated.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::policy::overstay_grace;
use crate::status::OverstayState;
use crate::types::{DbId, Money, Timestamp};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use crate::status::OverstayState;

    /// Returns the states reachable from `from`.
    ///
    /// `Completed` is terminal and returns an empty slice.
    pub fn valid_transitions(from: OverstayState) -> &'static [OverstayState] {
        use OverstayState::*;
        match from {
            OnTime => &[Overstaying, Completed],
            Overstaying => &[
                ResolvedViaPenalty,
                ResolvedViaReassignment,
                ResolvedViaCancellation,
                Completed,
            ],
            ResolvedViaPenalty | ResolvedViaReassignment | ResolvedViaCancellation => {
                &[Completed]
            }
            Completed => &[],
        }
    }

    pub fn can_transition(from: OverstayState, to: OverstayState) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: OverstayState, to: OverstayState) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid overstay transition: {from} -> {to}"))
        }
    }

    pub fn is_resolved(state: OverstayState) -> bool {
        matches!(
            state,
            OverstayState::ResolvedViaPenalty
                | OverstayState::ResolvedViaReassignment
                | OverstayState::ResolvedViaCancellation
        )
    }
}

// ---------------------------------------------------------------------------
// Sweep decisions
// ---------------------------------------------------------------------------

/// What a fresh `obstacle=true` reading means for one spot.
#[derive(Debug, Clone, PartialEq)]
pub enum OccupiedPlan {
    /// Nothing to do: no booking is affected, or the covering booking's
    /// vehicle is already recorded as arrived.
    Idle,
    /// The vehicle belongs to the booking currently covering `now`.
    Arrival { booking_id: DbId },
    /// A booking whose window has ended still holds the spot.
    Overstay { booking: Booking, overstay: Duration },
}

/// Decide what an occupied spot means given its bookings.
///
/// The overstayer is the active booking with the latest `end_time <= now`,
/// whether or not its arrival was ever recorded. A booking whose spot was
/// seen empty after its end has already been completed, so an ended booking
/// that is still active means nobody has vacated the spot since.
pub fn plan_occupied(bookings: &[Booking], now: Timestamp) -> OccupiedPlan {
    let overstayer = bookings
        .iter()
        .filter(|b| b.is_active() && b.has_ended(now))
        .max_by_key(|b| (b.end_time, b.id));

    match overstayer {
        Some(a) => OccupiedPlan::Overstay {
            booking: a.clone(),
            overstay: now - a.end_time,
        },
        None => arrival_of(bookings.iter().find(|b| b.is_active() && b.covers(now))),
    }
}

fn arrival_of(covering: Option<&Booking>) -> OccupiedPlan {
    match covering {
        Some(b) if b.arrived_at.is_none() => OccupiedPlan::Arrival { booking_id: b.id },
        _ => OccupiedPlan::Idle,
    }
}

/// Whether an overstay of `overstay` has exhausted the grace period.
/// Exactly the grace period is still tolerated.
pub fn beyond_grace(overstay: Duration) -> bool {
    overstay > overstay_grace()
}

/// Bookings queued behind `overstayer` that it is now blocking: other active
/// bookings on the spot starting in `[overstayer.end_time, now]`.
pub fn blocked_bookings<'a>(
    bookings: &'a [Booking],
    overstayer: &Booking,
    now: Timestamp,
) -> Vec<&'a Booking> {
    let mut blocked: Vec<&Booking> = bookings
        .iter()
        .filter(|b| {
            b.id != overstayer.id
                && b.is_active()
                && b.start_time >= overstayer.end_time
                && b.start_time <= now
        })
        .collect();
    blocked.sort_by_key(|b| (b.start_time, b.id));
    blocked
}

/// Bookings to complete when the spot reads vacant: every active booking
/// that has ended, plus the covering booking if its vehicle had arrived.
pub fn departed_bookings(bookings: &[Booking], now: Timestamp) -> Vec<&Booking> {
    bookings
        .iter()
        .filter(|b| {
            b.is_active() && (b.has_ended(now) || (b.covers(now) && b.arrived_at.is_some()))
        })
        .collect()
}

/// Final state of a resolved overstay given how the queued bookings fared.
pub fn resolution_state(reassigned: usize, cancelled: usize) -> OverstayState {
    if cancelled > 0 {
        OverstayState::ResolvedViaCancellation
    } else if reassigned > 0 {
        OverstayState::ResolvedViaReassignment
    } else {
        OverstayState::ResolvedViaPenalty
    }
}

/// Whole minutes of overstay, as shown to users.
pub fn overstay_minutes(overstay: Duration) -> i64 {
    overstay.num_minutes().max(0)
}

// ---------------------------------------------------------------------------
// Sweep results
// ---------------------------------------------------------------------------

/// A queued booking moved to another spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentRecord {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub from_spot_id: DbId,
    pub to_spot_id: DbId,
    pub new_spot_number: String,
}

/// A queued booking cancelled because no spot could take it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub refund_amount: Money,
    pub compensation: Money,
}

/// A penalty charged for an overstay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub overstay_minutes: i64,
    pub penalty: Money,
    pub charged_from_balance: Money,
    pub added_to_debt: Money,
    pub final_state: OverstayState,
}

/// A booking completed because its vehicle left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub booking_id: DbId,
    pub user_id: DbId,
    pub pending_debt: Money,
}

/// Outcome of one sweep (all spots, or a single spot).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Number of overstays resolved during the sweep.
    pub processed_count: usize,
    pub reassignments: Vec<ReassignmentRecord>,
    pub cancellations: Vec<CancellationRecord>,
    pub penalties: Vec<PenaltyRecord>,
    pub completions: Vec<CompletionRecord>,
    pub arrivals: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.processed_count += other.processed_count;
        self.reassignments.extend(other.reassignments);
        self.cancellations.extend(other.cancellations);
        self.penalties.extend(other.penalties);
        self.completions.extend(other.completions);
        self.arrivals += other.arrivals;
    }

    pub fn is_empty(&self) -> bool {
        self.processed_count == 0
            && self.completions.is_empty()
            && self.arrivals == 0
            && self.reassignments.is_empty()
            && self.cancellations.is_empty()
    }
}
