use axum::routing::{get, put};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Routes mounted at `/alerts`.
///
/// ```text
/// POST   /              -> file_alert
/// GET    /              -> list_alerts (admin)
/// PUT    /{id}/status   -> update_status (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alerts::list_alerts).post(alerts::file_alert))
        .route("/{id}/status", put(alerts::update_status))
}
