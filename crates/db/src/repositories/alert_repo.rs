//! Repository for the `security_alerts` table.

use klyra_core::alert::NewAlert;
use klyra_core::status::AlertStatus;
use klyra_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::alert::AlertRow;

/// Column list for `security_alerts` queries.
const COLUMNS: &str = "id, user_id, booking_id, spot_id, vehicle_number, description, \
     screenshot_ref, status_id, created_at, updated_at";

/// Provides CRUD operations for security alerts.
pub struct AlertRepo;

impl AlertRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &NewAlert,
        now: Timestamp,
    ) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO security_alerts \
                (user_id, booking_id, spot_id, vehicle_number, description, screenshot_ref, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(input.user_id)
            .bind(input.booking_id)
            .bind(input.spot_id)
            .bind(&input.vehicle_number)
            .bind(&input.description)
            .bind(&input.screenshot_ref)
            .bind(now)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM security_alerts WHERE id = $1");
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// List alerts newest first, optionally filtered by status.
    pub async fn list(
        db: impl PgExecutor<'_>,
        status: Option<AlertStatus>,
    ) -> Result<Vec<AlertRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM security_alerts \
             WHERE $1::SMALLINT IS NULL OR status_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(status.map(AlertStatus::id))
            .fetch_all(db)
            .await
    }

    /// Compare-and-set the alert status.
    pub async fn update_status(
        db: impl PgExecutor<'_>,
        id: DbId,
        from: AlertStatus,
        to: AlertStatus,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE security_alerts SET status_id = $3, updated_at = $4 \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(from.id())
        .bind(to.id())
        .bind(now)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
