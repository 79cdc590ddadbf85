//! Parking spots and occupancy sensor readings.

use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::error::CoreError;
use crate::policy::sensor_freshness;
use crate::types::{DbId, Timestamp};

/// Maximum length of a spot number (`A1`, `B-12`, ...).
pub const MAX_SPOT_NUMBER_LEN: usize = 16;

/// Past bookings shown on a spot's detail view.
pub const PAST_BOOKINGS_SHOWN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpot {
    pub id: DbId,
    pub spot_number: String,
    /// Location / zone label; spots sharing it are interchangeable.
    pub location: String,
    pub is_available: bool,
    pub sensor_id: Option<String>,
    pub camera_feed_url: Option<String>,
    pub created_at: Timestamp,
}

/// Admin request to register a spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSpot {
    pub spot_number: String,
    pub location: String,
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub camera_feed_url: Option<String>,
}

impl NewSpot {
    /// Trim fields, upper-case the spot number, and reject blanks.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let spot_number = self.spot_number.trim().to_uppercase();
        if spot_number.is_empty() || spot_number.len() > MAX_SPOT_NUMBER_LEN {
            return Err(CoreError::Validation(format!(
                "Spot number must be 1-{MAX_SPOT_NUMBER_LEN} characters"
            )));
        }
        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(CoreError::Validation("Location is required".to_string()));
        }
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Ok(Self {
            spot_number,
            location,
            sensor_id: non_blank(self.sensor_id),
            camera_feed_url: non_blank(self.camera_feed_url),
        })
    }
}

/// Latest reading reported by one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    /// `true` when a vehicle is detected.
    pub obstacle: bool,
    pub updated_at: Timestamp,
}

impl SensorReading {
    /// Readings older than the freshness window are ignored. Readings stamped
    /// in the future count as fresh.
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        now - self.updated_at <= sensor_freshness()
    }

    pub fn detects_vehicle(&self, now: Timestamp) -> bool {
        self.obstacle && self.is_fresh(now)
    }
}

/// Whether a spot currently shows a fresh obstacle reading.
pub fn fresh_obstacle(reading: Option<&SensorReading>, now: Timestamp) -> bool {
    reading.is_some_and(|r| r.detects_vehicle(now))
}

/// A spot is available when none of its active bookings covers `now`.
pub fn is_available_at<'a>(
    bookings: impl IntoIterator<Item = &'a Booking>,
    now: Timestamp,
) -> bool {
    !bookings
        .into_iter()
        .any(|b| b.is_active() && b.covers(now))
}

/// Spot listing entry with the live occupancy marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotOccupancy {
    #[serde(flatten)]
    pub spot: ParkingSpot,
    pub currently_occupied: bool,
}

/// Admin view of one spot and the bookings made on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotDetail {
    #[serde(flatten)]
    pub occupancy: SpotOccupancy,
    /// Active bookings starting after `now`, soonest first.
    pub upcoming: Vec<Booking>,
    /// Bookings that ended by `now`, newest first.
    pub past: Vec<Booking>,
}

impl SpotDetail {
    /// Split a spot's bookings around `now`. Bookings in progress belong to
    /// neither list.
    pub fn new(occupancy: SpotOccupancy, bookings: Vec<Booking>, now: Timestamp) -> Self {
        let (mut upcoming, mut past): (Vec<Booking>, Vec<Booking>) = bookings
            .into_iter()
            .filter(|b| b.start_time > now || b.end_time <= now)
            .partition(|b| b.start_time > now);
        upcoming.retain(Booking::is_active);
        upcoming.sort_by_key(|b| (b.start_time, b.id));
        past.sort_by(|a, b| b.end_time.cmp(&a.end_time).then(b.id.cmp(&a.id)));
        past.truncate(PAST_BOOKINGS_SHOWN);
        SpotDetail {
            occupancy,
            upcoming,
            past,
        }
    }
}

/// Counters for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_spots: usize,
    pub available_spots: usize,
    pub occupied_spots: usize,
    pub active_bookings: usize,
}

impl DashboardStats {
    pub fn tally(spots: &[ParkingSpot], active_bookings: usize) -> Self {
        let available_spots = spots.iter().filter(|s| s.is_available).count();
        DashboardStats {
            total_spots: spots.len(),
            available_spots,
            occupied_spots: spots.len() - available_spots,
            active_bookings,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;
    use crate::booking::test_support::{at, booking};
    use crate::status::BookingStatus;

    fn reading(obstacle: bool, updated_at: Timestamp) -> SensorReading {
        SensorReading {
            sensor_id: "SENS-A1".to_string(),
            obstacle,
            updated_at,
        }
    }

    #[test]
    fn freshness_boundary_is_two_minutes() {
        let now = at(12, 0);
        assert!(reading(true, now - Duration::minutes(2)).is_fresh(now));
        assert!(!reading(true, now - Duration::seconds(121)).is_fresh(now));
    }

    #[test]
    fn future_readings_are_fresh() {
        let now = at(12, 0);
        assert!(reading(true, now + Duration::minutes(10)).is_fresh(now));
    }

    #[test]
    fn fresh_obstacle_requires_vehicle_and_freshness() {
        let now = at(12, 0);
        assert!(fresh_obstacle(Some(&reading(true, now)), now));
        assert!(!fresh_obstacle(Some(&reading(false, now)), now));
        assert!(!fresh_obstacle(
            Some(&reading(true, now - Duration::minutes(5))),
            now
        ));
        assert!(!fresh_obstacle(None, now));
    }

    #[test]
    fn availability_follows_covering_bookings() {
        let mut bookings = vec![booking(1, 7, at(10, 0), at(11, 0))];
        assert!(!is_available_at(&bookings, at(10, 30)));
        assert!(is_available_at(&bookings, at(11, 0)));

        bookings[0].status = BookingStatus::Cancelled;
        assert!(is_available_at(&bookings, at(10, 30)));
    }

    #[test]
    fn new_spot_is_normalized() {
        let spot = NewSpot {
            spot_number: " a2 ".to_string(),
            location: " Level 1 ".to_string(),
            sensor_id: Some("  ".to_string()),
            camera_feed_url: None,
        }
        .normalized()
        .unwrap();
        assert_eq!(spot.spot_number, "A2");
        assert_eq!(spot.location, "Level 1");
        assert_eq!(spot.sensor_id, None);
    }

    #[test]
    fn new_spot_requires_number_and_location() {
        let blank = NewSpot {
            spot_number: " ".to_string(),
            location: "Level 1".to_string(),
            sensor_id: None,
            camera_feed_url: None,
        };
        assert_matches!(blank.normalized(), Err(CoreError::Validation(_)));
    }

    fn parking_spot(id: DbId, is_available: bool) -> ParkingSpot {
        ParkingSpot {
            id,
            spot_number: format!("A{id}"),
            location: "Level 1".to_string(),
            is_available,
            sensor_id: None,
            camera_feed_url: None,
            created_at: at(0, 0),
        }
    }

    #[test]
    fn detail_splits_bookings_around_now() {
        let done = booking(1, 7, at(8, 0), at(9, 0));
        let mut cancelled = booking(2, 7, at(9, 0), at(10, 0));
        cancelled.status = BookingStatus::Cancelled;
        let current = booking(3, 7, at(10, 0), at(11, 0));
        let later = booking(4, 7, at(13, 0), at(14, 0));
        let soon = booking(5, 7, at(11, 30), at(12, 30));
        let mut withdrawn = booking(6, 7, at(15, 0), at(16, 0));
        withdrawn.status = BookingStatus::Cancelled;
        let occupancy = SpotOccupancy {
            spot: parking_spot(7, false),
            currently_occupied: false,
        };

        let detail = SpotDetail::new(
            occupancy,
            vec![done, cancelled, current, later, soon, withdrawn],
            at(10, 30),
        );

        let ids = |list: &[Booking]| list.iter().map(|b| b.id).collect::<Vec<_>>();
        assert_eq!(ids(&detail.upcoming), vec![5, 4]);
        assert_eq!(ids(&detail.past), vec![2, 1]);
    }

    #[test]
    fn stats_count_spots_by_availability() {
        let spots = vec![parking_spot(1, true), parking_spot(2, false), parking_spot(3, true)];
        assert_eq!(
            DashboardStats::tally(&spots, 4),
            DashboardStats {
                total_spots: 3,
                available_spots: 2,
                occupied_spots: 1,
                active_bookings: 4,
            }
        );
    }
}
