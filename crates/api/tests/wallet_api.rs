//! Wallet, top-up and coupon endpoints.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, build_test_app, get, post_json, TestApp};
use klyra_core::status::TransactionKind;
use klyra_core::wallet::NewTransaction;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn money(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn owe(app: &TestApp, user_id: i64, debt: Decimal) {
    app.store
        .post_transaction(
            NewTransaction {
                user_id,
                kind: TransactionKind::OverstayPenalty,
                amount: Decimal::ZERO,
                debt_delta: debt,
                description: "Overstay penalty".to_string(),
                booking_id: None,
            },
            Utc::now(),
        )
        .await;
}

async fn mint(app: &TestApp, code: &str, amount: u32, max_uses: i32) -> StatusCode {
    post_json(
        app,
        "/api/v1/coupons",
        Some(&app.admin()),
        json!({ "code": code, "amount": amount.to_string(), "max_uses": max_uses }),
    )
    .await
    .status()
}

#[tokio::test]
async fn fresh_wallet_reads_as_empty() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/wallet", Some(&app.user(7))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], 7);
    assert_eq!(money(&json["data"]["credit_balance"]), Decimal::ZERO);
    assert_eq!(money(&json["data"]["pending_debt"]), Decimal::ZERO);

    let debt = body_json(get(&app, "/api/v1/wallet/pending-debt", Some(&app.user(7))).await).await;
    assert_eq!(money(&debt["data"]["pending_debt"]), Decimal::ZERO);
    assert!(debt["data"].get("reminder").is_none());
}

#[tokio::test]
async fn top_up_enforces_minimum() {
    let app = build_test_app();
    let token = app.user(1);

    let response = post_json(&app, "/api/v1/wallet/top-up", Some(&token), json!({ "amount": "49" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(&app, "/api/v1/wallet/top-up", Some(&token), json!({ "amount": "150" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(money(&json["data"]["credit_balance"]), dec!(150));
    assert_eq!(money(&json["data"]["credited_to_balance"]), dec!(150));
}

#[tokio::test]
async fn top_up_pays_debt_first() {
    let app = build_test_app();
    owe(&app, 1, dec!(80)).await;

    let response = post_json(
        &app,
        "/api/v1/wallet/top-up",
        Some(&app.user(1)),
        json!({ "amount": "100" }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(money(&json["data"]["applied_to_debt"]), dec!(80));
    assert_eq!(money(&json["data"]["credit_balance"]), dec!(20));
    assert_eq!(money(&json["data"]["pending_debt"]), Decimal::ZERO);
}

#[tokio::test]
async fn transaction_history_is_newest_first() {
    let app = build_test_app();
    let token = app.user(1);
    post_json(&app, "/api/v1/wallet/top-up", Some(&token), json!({ "amount": "50" })).await;
    post_json(&app, "/api/v1/wallet/top-up", Some(&token), json!({ "amount": "75" })).await;

    let json = body_json(get(&app, "/api/v1/wallet/transactions", Some(&token)).await).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(money(&rows[0]["amount"]), dec!(75));
    assert_eq!(rows[0]["kind"], "top_up");

    let json = body_json(get(&app, "/api/v1/wallet/transactions?limit=1", Some(&token)).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn minting_is_admin_only() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/coupons",
        Some(&app.user(1)),
        json!({ "code": "WELCOME100", "amount": "100", "max_uses": 5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(mint(&app, "WELCOME100", 100, 5).await, StatusCode::CREATED);
    assert_eq!(mint(&app, "welcome100", 100, 5).await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn redeeming_clears_debt_before_crediting() {
    let app = build_test_app();
    owe(&app, 1, dec!(120)).await;
    assert_eq!(mint(&app, "SAVE100", 100, 1).await, StatusCode::CREATED);

    let response = post_json(
        &app,
        "/api/v1/coupons/redeem",
        Some(&app.user(1)),
        json!({ "code": " save100 " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["code"], "SAVE100");
    assert_eq!(money(&json["data"]["applied_to_debt"]), dec!(100));
    assert_eq!(money(&json["data"]["credit_balance"]), Decimal::ZERO);
    assert_eq!(money(&json["data"]["pending_debt"]), dec!(20));

    let debt = body_json(get(&app, "/api/v1/wallet/pending-debt", Some(&app.user(1))).await).await;
    assert_eq!(debt["data"]["formatted"], "₹20.00");
}

#[tokio::test]
async fn exhausted_and_unknown_coupons_are_rejected() {
    let app = build_test_app();
    assert_eq!(mint(&app, "ONCE", 60, 1).await, StatusCode::CREATED);

    let first = post_json(&app, "/api/v1/coupons/redeem", Some(&app.user(1)), json!({ "code": "ONCE" })).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(money(&body_json(first).await["data"]["credit_balance"]), dec!(60));

    let again = post_json(&app, "/api/v1/coupons/redeem", Some(&app.user(1)), json!({ "code": "ONCE" })).await;
    assert_eq!(again.status(), StatusCode::GONE);
    assert_eq!(body_json(again).await["code"], "COUPON_EXHAUSTED");
    let wallet = body_json(get(&app, "/api/v1/wallet", Some(&app.user(1))).await).await;
    assert_eq!(money(&wallet["data"]["credit_balance"]), dec!(60));
    assert_eq!(app.store.ledger(1).await.len(), 1);

    let second = post_json(&app, "/api/v1/coupons/redeem", Some(&app.user(2)), json!({ "code": "ONCE" })).await;
    assert_eq!(second.status(), StatusCode::GONE);
    assert_eq!(body_json(second).await["code"], "COUPON_EXHAUSTED");

    let unknown = post_json(&app, "/api/v1/coupons/redeem", Some(&app.user(1)), json!({ "code": "NOPE" })).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(unknown).await["code"], "COUPON_NOT_FOUND");
}

#[tokio::test]
async fn gift_coupon_can_be_redeemed_once_by_anyone() {
    let app = build_test_app();
    let response = post_json(&app, "/api/v1/coupons/gift", Some(&app.user(1)), json!({ "amount": "100" })).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let code = json["data"]["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("KLYRA"));
    assert_eq!(json["data"]["max_uses"], 1);

    let redeemed = post_json(&app, "/api/v1/coupons/redeem", Some(&app.user(2)), json!({ "code": code })).await;
    assert_eq!(redeemed.status(), StatusCode::OK);
    assert_eq!(money(&body_json(redeemed).await["data"]["credit_balance"]), dec!(100));

    let too_small = post_json(&app, "/api/v1/coupons/gift", Some(&app.user(1)), json!({ "amount": "10" })).await;
    assert_eq!(too_small.status(), StatusCode::BAD_REQUEST);
}
