//! Parking engine: booking protocol, start validation, overstay sweeps and
//! wallet operations.
//!
//! The engine reads through the [`ParkingStore`], decides in memory using
//! `klyra_core`, and hands each decision back to the store as one atomic
//! command. A command that lost a race is skipped and re-planned on the
//! next call.

pub mod alerts;
pub mod booking;
pub mod overstay;
pub mod spots;
pub mod start_validation;
pub mod wallet;

use std::collections::HashMap;
use std::sync::Arc;

use klyra_core::booking::Booking;
use klyra_core::error::CoreError;
use klyra_core::policy::EnginePolicy;
use klyra_core::reassignment::SpotSnapshot;
use klyra_core::spot::SensorReading;
use klyra_core::store::ParkingStore;
use klyra_core::types::DbId;

pub use start_validation::{StartAction, StartValidation};
pub use wallet::Redemption;

/// Business operations over a [`ParkingStore`].
pub struct ParkingEngine {
    store: Arc<dyn ParkingStore>,
    policy: EnginePolicy,
}

impl ParkingEngine {
    pub fn new(store: Arc<dyn ParkingStore>, policy: EnginePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn ParkingStore> {
        &self.store
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Snapshot every spot with its latest reading and active bookings.
    async fn snapshots(&self) -> Result<Vec<SpotSnapshot>, CoreError> {
        let spots = self.store.list_spots().await?;
        let readings: HashMap<String, SensorReading> = self
            .store
            .list_readings()
            .await?
            .into_iter()
            .map(|r| (r.sensor_id.clone(), r))
            .collect();

        let mut by_spot: HashMap<DbId, Vec<Booking>> = HashMap::new();
        for booking in self.store.list_active_bookings().await? {
            by_spot.entry(booking.spot_id).or_default().push(booking);
        }

        Ok(spots
            .into_iter()
            .map(|spot| {
                let reading = spot
                    .sensor_id
                    .as_ref()
                    .and_then(|sensor| readings.get(sensor).cloned());
                let mut bookings = by_spot.remove(&spot.id).unwrap_or_default();
                bookings.sort_by_key(|b| (b.start_time, b.id));
                SpotSnapshot {
                    spot,
                    reading,
                    bookings,
                }
            })
            .collect())
    }

    async fn reading_for(&self, sensor_id: Option<&str>) -> Result<Option<SensorReading>, CoreError> {
        match sensor_id {
            Some(sensor) => self.store.find_reading(sensor).await,
            None => Ok(None),
        }
    }
}
