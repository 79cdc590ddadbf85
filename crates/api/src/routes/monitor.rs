use axum::routing::post;
use axum::Router;

use crate::handlers::monitor;
use crate::state::AppState;

/// Routes mounted at `/monitor`.
///
/// ```text
/// POST   /sweep   -> sweep (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/sweep", post(monitor::sweep))
}
