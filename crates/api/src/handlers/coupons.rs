//! Handlers for the `/coupons` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use klyra_core::coupon::{Coupon, NewCoupon};
use klyra_core::types::Money;
use serde::Deserialize;

use crate::engine::Redemption;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct GiftBody {
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct MintBody {
    pub code: String,
    pub amount: Money,
    pub max_uses: i32,
}

/// POST /api/v1/coupons/redeem
pub async fn redeem(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RedeemBody>,
) -> AppResult<Json<DataResponse<Redemption>>> {
    let redemption = state
        .engine
        .redeem_coupon(auth.user_id, &body.code, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: redemption }))
}

/// POST /api/v1/coupons/gift
///
/// Issue a single-use gift code. Payment is confirmed before this call.
pub async fn gift(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<GiftBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Coupon>>)> {
    let coupon = state
        .engine
        .gift_coupon(auth.user_id, body.amount, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: coupon })))
}

/// POST /api/v1/coupons
pub async fn mint(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<MintBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Coupon>>)> {
    let coupon = state
        .engine
        .mint_coupon(
            admin.user_id,
            NewCoupon {
                code: body.code,
                amount: body.amount,
                max_uses: body.max_uses,
                created_by: None,
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: coupon })))
}
