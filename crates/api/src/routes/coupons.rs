use axum::routing::post;
use axum::Router;

use crate::handlers::coupons;
use crate::state::AppState;

/// Routes mounted at `/coupons`.
///
/// ```text
/// POST   /          -> mint (admin)
/// POST   /redeem    -> redeem
/// POST   /gift      -> gift
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(coupons::mint))
        .route("/redeem", post(coupons::redeem))
        .route("/gift", post(coupons::gift))
}
