//! Repository layer: one zero-sized struct per table with async query fns.
//!
//! Every function accepts any `PgExecutor`, so the same query runs against
//! the pool or inside a transaction (`&mut *tx`).

pub mod alert_repo;
pub mod booking_repo;
pub mod coupon_repo;
pub mod notification_repo;
pub mod spot_repo;
pub mod wallet_repo;

pub use alert_repo::AlertRepo;
pub use booking_repo::BookingRepo;
pub use coupon_repo::CouponRepo;
pub use notification_repo::NotificationRepo;
pub use spot_repo::{SensorReadingRepo, SpotRepo};
pub use wallet_repo::{TransactionRepo, WalletRepo};
