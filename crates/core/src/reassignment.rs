//! Choosing a target spot for a displaced booking.
//!
//! A candidate must differ from the origin, be free right now (no covering
//! booking, no fresh obstacle), and accept the displaced window without
//! breaking the buffered-window rule. Same-location spots are preferred;
//! ties break by spot number.

use std::collections::HashMap;

use crate::booking::{find_conflict, Booking};
use crate::policy::EnginePolicy;
use crate::spot::{fresh_obstacle, ParkingSpot, SensorReading};
use crate::types::{DbId, Timestamp};

/// Everything the planner needs to know about one spot.
#[derive(Debug, Clone)]
pub struct SpotSnapshot {
    pub spot: ParkingSpot,
    pub reading: Option<SensorReading>,
    /// Active bookings currently on the spot.
    pub bookings: Vec<Booking>,
}

/// Picks targets for a sequence of displaced bookings, remembering earlier
/// picks so two displaced bookings never collide on the same target.
#[derive(Debug)]
pub struct ReassignmentPlanner<'p> {
    snapshots: Vec<SpotSnapshot>,
    policy: &'p EnginePolicy,
    now: Timestamp,
    planned: HashMap<DbId, Vec<Booking>>,
}

impl<'p> ReassignmentPlanner<'p> {
    pub fn new(mut snapshots: Vec<SpotSnapshot>, policy: &'p EnginePolicy, now: Timestamp) -> Self {
        snapshots.sort_by(|a, b| a.spot.spot_number.cmp(&b.spot.spot_number));
        Self {
            snapshots,
            policy,
            now,
            planned: HashMap::new(),
        }
    }

    /// Choose a target for `displaced`, currently on `origin`. The pick is
    /// remembered for later calls.
    pub fn assign(&mut self, origin: &ParkingSpot, displaced: &Booking) -> Option<&ParkingSpot> {
        let same_location = self.pick(origin, displaced, true);
        let index = match same_location {
            Some(i) => Some(i),
            None if self.policy.reassign_across_locations => self.pick(origin, displaced, false),
            None => None,
        }?;

        let target_id = self.snapshots[index].spot.id;
        let mut moved = displaced.clone();
        moved.spot_id = target_id;
        self.planned.entry(target_id).or_default().push(moved);
        Some(&self.snapshots[index].spot)
    }

    fn pick(&self, origin: &ParkingSpot, displaced: &Booking, same_location: bool) -> Option<usize> {
        self.snapshots.iter().position(|snap| {
            snap.spot.id != origin.id
                && (snap.spot.location == origin.location) == same_location
                && self.accepts(snap, displaced)
        })
    }

    fn accepts(&self, snap: &SpotSnapshot, displaced: &Booking) -> bool {
        let planned = self
            .planned
            .get(&snap.spot.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let on_spot = || snap.bookings.iter().chain(planned.iter());

        !fresh_obstacle(snap.reading.as_ref(), self.now)
            && !on_spot().any(|b| b.is_active() && b.covers(self.now))
            && find_conflict(
                on_spot(),
                displaced.start_time,
                displaced.end_time,
                Some(displaced.id),
            )
            .is_none()
    }
}
