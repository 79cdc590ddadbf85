pub mod admin;
pub mod alerts;
pub mod bookings;
pub mod coupons;
pub mod monitor;
pub mod notifications;
pub mod spots;
pub mod wallet;
