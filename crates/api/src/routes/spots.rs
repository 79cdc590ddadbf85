use axum::routing::{get, post};
use axum::Router;

use crate::handlers::spots;
use crate::state::AppState;

/// Routes mounted at `/spots`.
///
/// ```text
/// GET    /                      -> list_spots
/// POST   /                      -> create_spot (admin)
/// GET    /{id}/bookings         -> spot_bookings (admin)
/// POST   /{id}/overstay-check   -> check_overstay (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(spots::list_spots).post(spots::create_spot))
        .route("/{id}/bookings", get(spots::spot_bookings))
        .route("/{id}/overstay-check", post(spots::check_overstay))
}
