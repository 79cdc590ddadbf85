//! Coupon rows.

use klyra_core::coupon::Coupon;
use klyra_core::types::{DbId, Money, Timestamp};
use sqlx::FromRow;

/// A row from the `coupons` table.
#[derive(Debug, Clone, FromRow)]
pub struct CouponRow {
    pub id: DbId,
    pub code: String,
    pub amount: Money,
    pub max_uses: i32,
    pub used_count: i32,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: row.id,
            code: row.code,
            amount: row.amount,
            max_uses: row.max_uses,
            used_count: row.used_count,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}
