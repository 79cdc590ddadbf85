//! Repository for the `notifications` table.

use klyra_core::notification::NewNotification;
use klyra_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::notification::NotificationRow;

/// Column list for `notifications` queries.
const COLUMNS: &str =
    "id, user_id, booking_id, spot_id, kind_id, title, message, is_read, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notice unless one of the same kind exists for the booking and
    /// target spot.
    ///
    /// Returns `true` when a row was written.
    pub async fn create_once(
        db: impl PgExecutor<'_>,
        notice: &NewNotification,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO notifications \
                 (user_id, booking_id, spot_id, kind_id, title, message, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT DO NOTHING",
        )
        .bind(notice.user_id)
        .bind(notice.booking_id)
        .bind(notice.spot_id)
        .bind(notice.kind.id())
        .bind(&notice.title)
        .bind(&notice.message)
        .bind(now)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_user(
        db: impl PgExecutor<'_>,
        user_id: DbId,
        unread_only: bool,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {filter} \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `true` if the notification exists for the given user.
    pub async fn mark_read(
        db: impl PgExecutor<'_>,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
