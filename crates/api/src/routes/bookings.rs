//! Route definitions for the `/bookings` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// POST   /                      -> create_booking
/// GET    /                      -> list_bookings
/// GET    /{id}                  -> get_booking
/// POST   /{id}/extend           -> extend_booking
/// POST   /{id}/validate-start   -> validate_start (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/extend", post(bookings::extend_booking))
        .route("/{id}/validate-start", post(bookings::validate_start))
}
