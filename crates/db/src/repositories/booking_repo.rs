//! Repository for the `bookings` table.
//!
//! State-changing updates are guarded by their expected current state in
//! the `WHERE` clause and report whether a row matched.

use klyra_core::booking::NewBooking;
use klyra_core::status::{BookingStatus, OverstayState};
use klyra_core::types::{DbId, Money, Timestamp};
use sqlx::PgExecutor;

use crate::models::booking::BookingRow;

/// Column list for `bookings` queries.
const COLUMNS: &str = "id, user_id, spot_id, vehicle_number, start_time, end_time, status_id, \
     total_cost, overstay_state_id, overstay_penalty, pending_debt, reassigned_from, \
     arrived_at, start_validated_at, completed_at, cancelled_at, created_at, updated_at";

/// Provides queries and guarded updates for bookings.
pub struct BookingRepo;

impl BookingRepo {
    /// Insert an active booking, returning the created row.
    ///
    /// The buffered-window exclusion constraint rejects overlaps with
    /// SQLSTATE `23P01`.
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &NewBooking,
        now: Timestamp,
    ) -> Result<BookingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO bookings \
                (user_id, spot_id, vehicle_number, start_time, end_time, total_cost, \
                 start_validated_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(input.user_id)
            .bind(input.spot_id)
            .bind(&input.vehicle_number)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.total_cost)
            .bind(input.start_validated.then_some(now))
            .bind(now)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<BookingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Fetch and row-lock a booking for the rest of the transaction.
    pub async fn lock(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<BookingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// List a user's bookings, newest first.
    pub async fn list_for_user(
        db: impl PgExecutor<'_>,
        user_id: DbId,
        active_only: bool,
    ) -> Result<Vec<BookingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE user_id = $1 AND ($2 = false OR status_id = $3) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(user_id)
            .bind(active_only)
            .bind(BookingStatus::Active.id())
            .fetch_all(db)
            .await
    }

    /// Active bookings on one spot ordered by start time.
    /// Every booking on a spot, any status.
    pub async fn list_for_spot(
        db: impl PgExecutor<'_>,
        spot_id: DbId,
    ) -> Result<Vec<BookingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings WHERE spot_id = $1 ORDER BY start_time, id"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(spot_id)
            .fetch_all(db)
            .await
    }

    pub async fn active_for_spot(
        db: impl PgExecutor<'_>,
        spot_id: DbId,
    ) -> Result<Vec<BookingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE spot_id = $1 AND status_id = $2 \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(spot_id)
            .bind(BookingStatus::Active.id())
            .fetch_all(db)
            .await
    }

    pub async fn list_active(db: impl PgExecutor<'_>) -> Result<Vec<BookingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings WHERE status_id = $1 ORDER BY spot_id, start_time"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(BookingStatus::Active.id())
            .fetch_all(db)
            .await
    }

    /// Active, not yet validated bookings starting in `[from, to]`.
    pub async fn pending_start_validation(
        db: impl PgExecutor<'_>,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<BookingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE status_id = $1 AND start_validated_at IS NULL \
               AND start_time >= $2 AND start_time <= $3 \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(BookingStatus::Active.id())
            .bind(from)
            .bind(to)
            .fetch_all(db)
            .await
    }

    /// Move the end of an active booking and add to its cost.
    pub async fn extend(
        db: impl PgExecutor<'_>,
        id: DbId,
        new_end: Timestamp,
        cost: Money,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET end_time = $2, total_cost = total_cost + $3, updated_at = $4 \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(new_end)
        .bind(cost)
        .bind(now)
        .bind(BookingStatus::Active.id())
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the first arrival on an active booking.
    pub async fn record_arrival(
        db: impl PgExecutor<'_>,
        id: DbId,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings SET arrived_at = $2, updated_at = $2 \
             WHERE id = $1 AND status_id = $3 AND arrived_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .bind(BookingStatus::Active.id())
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Compare-and-set the overstay state of an active booking.
    pub async fn transition_overstay(
        db: impl PgExecutor<'_>,
        id: DbId,
        from: OverstayState,
        to: OverstayState,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings SET overstay_state_id = $3, updated_at = $4 \
             WHERE id = $1 AND overstay_state_id = $2 AND status_id = $5",
        )
        .bind(id)
        .bind(from.id())
        .bind(to.id())
        .bind(now)
        .bind(BookingStatus::Active.id())
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_start_validated(
        db: impl PgExecutor<'_>,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings SET start_validated_at = $2, updated_at = $2 \
             WHERE id = $1 AND start_validated_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an active booking from `from_spot` to `to_spot`, keeping the
    /// first origin in `reassigned_from`.
    pub async fn reassign(
        db: impl PgExecutor<'_>,
        id: DbId,
        from_spot: DbId,
        to_spot: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET spot_id = $3, reassigned_from = COALESCE(reassigned_from, $2), updated_at = $4 \
             WHERE id = $1 AND spot_id = $2 AND status_id = $5",
        )
        .bind(id)
        .bind(from_spot)
        .bind(to_spot)
        .bind(now)
        .bind(BookingStatus::Active.id())
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel an active booking on `spot_id`, returning its owner.
    pub async fn cancel(
        db: impl PgExecutor<'_>,
        id: DbId,
        spot_id: DbId,
        now: Timestamp,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE bookings \
             SET status_id = $4, cancelled_at = $3, updated_at = $3 \
             WHERE id = $1 AND spot_id = $2 AND status_id = $5 \
             RETURNING user_id",
        )
        .bind(id)
        .bind(spot_id)
        .bind(now)
        .bind(BookingStatus::Cancelled.id())
        .bind(BookingStatus::Active.id())
        .fetch_optional(db)
        .await
    }

    /// Store the outcome of an overstay resolution.
    pub async fn record_resolution(
        db: impl PgExecutor<'_>,
        id: DbId,
        state: OverstayState,
        penalty: Money,
        pending_debt: Option<Money>,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET overstay_state_id = $2, overstay_penalty = $3, pending_debt = $4, updated_at = $5 \
             WHERE id = $1 AND overstay_state_id = $6",
        )
        .bind(id)
        .bind(state.id())
        .bind(penalty)
        .bind(pending_debt)
        .bind(now)
        .bind(OverstayState::Overstaying.id())
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Complete an active booking, returning `(user_id, spot_id)`.
    pub async fn complete(
        db: impl PgExecutor<'_>,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<(DbId, DbId)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, DbId)>(
            "UPDATE bookings \
             SET status_id = $3, overstay_state_id = $4, completed_at = $2, updated_at = $2 \
             WHERE id = $1 AND status_id = $5 \
             RETURNING user_id, spot_id",
        )
        .bind(id)
        .bind(now)
        .bind(BookingStatus::Completed.id())
        .bind(OverstayState::Completed.id())
        .bind(BookingStatus::Active.id())
        .fetch_optional(db)
        .await
    }
}
