pub mod admin;
pub mod alerts;
pub mod bookings;
pub mod coupons;
pub mod health;
pub mod monitor;
pub mod notifications;
pub mod sensors;
pub mod spots;
pub mod wallet;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /bookings                         create, list own
/// /bookings/{id}                    read (owner or admin)
/// /bookings/{id}/extend             extend (owner)
/// /bookings/{id}/validate-start     start check now (admin)
///
/// /wallet                           balance and debt
/// /wallet/transactions              ledger history
/// /wallet/pending-debt              outstanding debt
/// /wallet/top-up                    credit the wallet
///
/// /coupons                          mint (admin)
/// /coupons/redeem                   redeem a code
/// /coupons/gift                     buy a gift code
///
/// /spots                            list with occupancy, create (admin)
/// /spots/{id}/bookings              upcoming and past bookings (admin)
/// /spots/{id}/overstay-check        single-spot sweep (admin)
/// /sensors/{sensor_id}/readings     ingest a reading (sensor or admin)
/// /monitor/sweep                    run both monitors now (admin)
///
/// /notifications                    list own
/// /notifications/{id}/read          mark read
///
/// /alerts                           file, list (admin)
/// /alerts/{id}/status               advance (admin)
///
/// /admin/stats                      dashboard counters (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/bookings", bookings::router())
        .nest("/wallet", wallet::router())
        .nest("/coupons", coupons::router())
        .nest("/spots", spots::router())
        .nest("/sensors", sensors::router())
        .nest("/monitor", monitor::router())
        .nest("/notifications", notifications::router())
        .nest("/alerts", alerts::router())
        .nest("/admin", admin::router())
}
