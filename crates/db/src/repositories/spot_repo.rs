//! Repositories for the `parking_spots` and `sensor_readings` tables.

use klyra_core::spot::{NewSpot, SensorReading};
use klyra_core::status::BookingStatus;
use klyra_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::spot::{SensorReadingRow, SpotRow};

/// Column list for `parking_spots` queries.
const COLUMNS: &str =
    "id, spot_number, location, is_available, sensor_id, camera_feed_url, created_at";

/// Provides CRUD operations for parking spots.
pub struct SpotRepo;

impl SpotRepo {
    /// Insert a new spot, returning the created row.
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &NewSpot,
        now: Timestamp,
    ) -> Result<SpotRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO parking_spots (spot_number, location, sensor_id, camera_feed_url, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpotRow>(&query)
            .bind(&input.spot_number)
            .bind(&input.location)
            .bind(&input.sensor_id)
            .bind(&input.camera_feed_url)
            .bind(now)
            .fetch_one(db)
            .await
    }

    /// List all spots ordered by spot number.
    pub async fn list(db: impl PgExecutor<'_>) -> Result<Vec<SpotRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parking_spots ORDER BY spot_number");
        sqlx::query_as::<_, SpotRow>(&query).fetch_all(db).await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<SpotRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parking_spots WHERE id = $1");
        sqlx::query_as::<_, SpotRow>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Lock the given spots in ID order. Missing IDs are simply absent from
    /// the result.
    pub async fn lock_many(
        db: impl PgExecutor<'_>,
        ids: &[DbId],
    ) -> Result<Vec<SpotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parking_spots WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );
        sqlx::query_as::<_, SpotRow>(&query)
            .bind(ids)
            .fetch_all(db)
            .await
    }

    /// Recompute `is_available` from active bookings covering `now`.
    ///
    /// Restricted to `spot_ids` when given. Returns the number of spots whose
    /// flag changed.
    pub async fn refresh_availability(
        db: impl PgExecutor<'_>,
        now: Timestamp,
        spot_ids: Option<&[DbId]>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE parking_spots s \
             SET is_available = NOT o.occupied \
             FROM ( \
                 SELECT p.id, EXISTS ( \
                     SELECT 1 FROM bookings b \
                     WHERE b.spot_id = p.id AND b.status_id = $2 \
                       AND b.start_time <= $1 AND b.end_time > $1 \
                 ) AS occupied \
                 FROM parking_spots p \
                 WHERE $3::BIGINT[] IS NULL OR p.id = ANY($3) \
             ) o \
             WHERE s.id = o.id AND s.is_available = o.occupied",
        )
        .bind(now)
        .bind(BookingStatus::Active.id())
        .bind(spot_ids)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Provides upsert and lookups for the latest sensor readings.
pub struct SensorReadingRepo;

impl SensorReadingRepo {
    /// Insert or replace the reading for a sensor.
    pub async fn upsert(
        db: impl PgExecutor<'_>,
        reading: &SensorReading,
    ) -> Result<SensorReadingRow, sqlx::Error> {
        sqlx::query_as::<_, SensorReadingRow>(
            "INSERT INTO sensor_readings (sensor_id, obstacle, updated_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (sensor_id) DO UPDATE \
             SET obstacle = EXCLUDED.obstacle, updated_at = EXCLUDED.updated_at \
             RETURNING sensor_id, obstacle, updated_at",
        )
        .bind(&reading.sensor_id)
        .bind(reading.obstacle)
        .bind(reading.updated_at)
        .fetch_one(db)
        .await
    }

    pub async fn find(
        db: impl PgExecutor<'_>,
        sensor_id: &str,
    ) -> Result<Option<SensorReadingRow>, sqlx::Error> {
        sqlx::query_as::<_, SensorReadingRow>(
            "SELECT sensor_id, obstacle, updated_at FROM sensor_readings WHERE sensor_id = $1",
        )
        .bind(sensor_id)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: impl PgExecutor<'_>) -> Result<Vec<SensorReadingRow>, sqlx::Error> {
        sqlx::query_as::<_, SensorReadingRow>(
            "SELECT sensor_id, obstacle, updated_at FROM sensor_readings ORDER BY sensor_id",
        )
        .fetch_all(db)
        .await
    }
}
