use axum::routing::post;
use axum::Router;

use crate::handlers::spots;
use crate::state::AppState;

/// Routes mounted at `/sensors`.
///
/// ```text
/// POST   /{sensor_id}/readings   -> record_reading (sensor or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{sensor_id}/readings", post(spots::record_reading))
}
