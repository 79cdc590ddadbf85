//! Domain core of the Klyra parking service: bookings, overstay handling,
//! the wallet ledger, and the [`store::ParkingStore`] seam.
//!
//! Everything here is pure or in-memory so it can be shared by the API
//! server, the PostgreSQL store, and tests.

pub mod alert;
pub mod booking;
pub mod coupon;
pub mod error;
pub mod money;
pub mod notification;
pub mod overstay;
pub mod policy;
pub mod reassignment;
pub mod roles;
pub mod spot;
pub mod status;
pub mod store;
pub mod types;
pub mod wallet;
