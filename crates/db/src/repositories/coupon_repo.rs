//! Repository for the `coupons` table.

use klyra_core::coupon::NewCoupon;
use klyra_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::coupon::CouponRow;

/// Column list for `coupons` queries.
const COLUMNS: &str = "id, code, amount, max_uses, used_count, is_active, created_by, created_at";

/// Provides minting, lookup and usage updates for coupons.
pub struct CouponRepo;

impl CouponRepo {
    /// Insert a coupon. A duplicate code violates `uq_coupons_code`.
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &NewCoupon,
        now: Timestamp,
    ) -> Result<CouponRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO coupons (code, amount, max_uses, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CouponRow>(&query)
            .bind(&input.code)
            .bind(input.amount)
            .bind(input.max_uses)
            .bind(input.created_by)
            .bind(now)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_code(
        db: impl PgExecutor<'_>,
        code: &str,
    ) -> Result<Option<CouponRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM coupons WHERE code = $1");
        sqlx::query_as::<_, CouponRow>(&query)
            .bind(code)
            .fetch_optional(db)
            .await
    }

    /// Fetch and row-lock a coupon by code.
    pub async fn lock_by_code(
        db: impl PgExecutor<'_>,
        code: &str,
    ) -> Result<Option<CouponRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM coupons WHERE code = $1 FOR UPDATE");
        sqlx::query_as::<_, CouponRow>(&query)
            .bind(code)
            .fetch_optional(db)
            .await
    }

    pub async fn record_use(
        db: impl PgExecutor<'_>,
        id: DbId,
        used_count: i32,
        is_active: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE coupons SET used_count = $2, is_active = $3 WHERE id = $1")
            .bind(id)
            .bind(used_count)
            .bind(is_active)
            .execute(db)
            .await?;
        Ok(())
    }
}
