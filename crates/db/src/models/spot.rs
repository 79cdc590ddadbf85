//! Parking spot and sensor reading rows.

use klyra_core::spot::{ParkingSpot, SensorReading};
use klyra_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `parking_spots` table.
#[derive(Debug, Clone, FromRow)]
pub struct SpotRow {
    pub id: DbId,
    pub spot_number: String,
    pub location: String,
    pub is_available: bool,
    pub sensor_id: Option<String>,
    pub camera_feed_url: Option<String>,
    pub created_at: Timestamp,
}

impl From<SpotRow> for ParkingSpot {
    fn from(row: SpotRow) -> Self {
        ParkingSpot {
            id: row.id,
            spot_number: row.spot_number,
            location: row.location,
            is_available: row.is_available,
            sensor_id: row.sensor_id,
            camera_feed_url: row.camera_feed_url,
            created_at: row.created_at,
        }
    }
}

/// A row from the `sensor_readings` table.
#[derive(Debug, Clone, FromRow)]
pub struct SensorReadingRow {
    pub sensor_id: String,
    pub obstacle: bool,
    pub updated_at: Timestamp,
}

impl From<SensorReadingRow> for SensorReading {
    fn from(row: SensorReadingRow) -> Self {
        SensorReading {
            sensor_id: row.sensor_id,
            obstacle: row.obstacle,
            updated_at: row.updated_at,
        }
    }
}
