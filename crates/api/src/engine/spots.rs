//! Spot registry and sensor feed.

use klyra_core::error::CoreError;
use klyra_core::spot::{
    fresh_obstacle, DashboardStats, NewSpot, ParkingSpot, SensorReading, SpotDetail, SpotOccupancy,
};
use klyra_core::types::{DbId, Timestamp};

use super::ParkingEngine;

impl ParkingEngine {
    /// Every spot with its live occupancy marker, ordered by spot number.
    pub async fn list_spots(&self, now: Timestamp) -> Result<Vec<SpotOccupancy>, CoreError> {
        let mut spots: Vec<SpotOccupancy> = self
            .snapshots()
            .await?
            .into_iter()
            .map(|snap| SpotOccupancy {
                currently_occupied: fresh_obstacle(snap.reading.as_ref(), now),
                spot: snap.spot,
            })
            .collect();
        spots.sort_by(|a, b| a.spot.spot_number.cmp(&b.spot.spot_number));
        Ok(spots)
    }

    /// One spot with its upcoming and past bookings.
    pub async fn spot_detail(
        &self,
        spot_id: DbId,
        now: Timestamp,
    ) -> Result<SpotDetail, CoreError> {
        let spot = self
            .store
            .find_spot(spot_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ParkingSpot",
                id: spot_id,
            })?;
        let reading = self.reading_for(spot.sensor_id.as_deref()).await?;
        let bookings = self.store.list_bookings_for_spot(spot_id).await?;
        let occupancy = SpotOccupancy {
            currently_occupied: fresh_obstacle(reading.as_ref(), now),
            spot,
        };
        Ok(SpotDetail::new(occupancy, bookings, now))
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, CoreError> {
        let spots = self.store.list_spots().await?;
        let active = self.store.list_active_bookings().await?;
        Ok(DashboardStats::tally(&spots, active.len()))
    }

    pub async fn create_spot(&self, spot: NewSpot, now: Timestamp) -> Result<ParkingSpot, CoreError> {
        let spot = spot.normalized()?;
        let created = self.store.insert_spot(spot, now).await?;
        tracing::info!(
            spot_id = created.id,
            spot_number = %created.spot_number,
            location = %created.location,
            "Parking spot created",
        );
        Ok(created)
    }

    /// Store the latest reading of a sensor. `updated_at` defaults to receipt time.
    pub async fn record_reading(
        &self,
        sensor_id: &str,
        obstacle: bool,
        updated_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<SensorReading, CoreError> {
        let sensor_id = sensor_id.trim();
        if sensor_id.is_empty() {
            return Err(CoreError::Validation("Sensor id is required".to_string()));
        }
        let reading = self
            .store
            .record_reading(SensorReading {
                sensor_id: sensor_id.to_string(),
                obstacle,
                updated_at: updated_at.unwrap_or(now),
            })
            .await?;
        tracing::debug!(sensor_id, obstacle, updated_at = %reading.updated_at, "Sensor reading stored");
        Ok(reading)
    }
}
