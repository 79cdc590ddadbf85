//! Security alerts filed by users and triaged by admins.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{body_json, build_test_app, fund, get, now_minute, post_json, put_json, seed_booking, seed_spot};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn alert_lifecycle() {
    let app = build_test_app();
    let a1 = seed_spot(&app.store, "A1", "Level 1").await;
    fund(&app.store, 1, dec!(50)).await;
    let start = now_minute() - Duration::minutes(10);
    let booking = seed_booking(&app.store, 1, a1.id, start, start + Duration::hours(1), dec!(50)).await;

    let response = post_json(
        &app,
        "/api/v1/alerts",
        Some(&app.user(1)),
        json!({ "booking_id": booking.id, "description": "  Someone is parked in my spot  " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let alert = body_json(response).await;
    assert_eq!(alert["data"]["status"], "pending");
    assert_eq!(alert["data"]["spot_id"], a1.id);
    assert_eq!(alert["data"]["description"], "Someone is parked in my spot");
    let id = alert["data"]["id"].as_i64().unwrap();

    let pending = body_json(get(&app, "/api/v1/alerts?status=pending", Some(&app.admin())).await).await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/alerts/{id}/status");
    let response = put_json(&app, &uri, Some(&app.admin()), json!({ "status": "reviewing" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "reviewing");

    let response = put_json(&app, &uri, Some(&app.admin()), json!({ "status": "pending" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json(&app, &uri, Some(&app.admin()), json!({ "status": "resolved" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let pending = body_json(get(&app, "/api/v1/alerts?status=pending", Some(&app.admin())).await).await;
    assert!(pending["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn alerts_are_filed_by_the_booking_owner_only() {
    let app = build_test_app();
    let a1 = seed_spot(&app.store, "A1", "Level 1").await;
    fund(&app.store, 1, dec!(50)).await;
    let start = now_minute() + Duration::hours(1);
    let booking = seed_booking(&app.store, 1, a1.id, start, start + Duration::hours(1), dec!(50)).await;

    let response = post_json(
        &app,
        "/api/v1/alerts",
        Some(&app.user(2)),
        json!({ "booking_id": booking.id, "description": "blocked" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        &app,
        "/api/v1/alerts",
        Some(&app.user(1)),
        json!({ "booking_id": booking.id, "description": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/v1/alerts",
        Some(&app.user(1)),
        json!({ "booking_id": 9999, "description": "blocked" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn alert_triage_is_admin_only() {
    let app = build_test_app();

    let response = get(&app, "/api/v1/alerts", Some(&app.user(1))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json(
        &app,
        "/api/v1/alerts/1/status",
        Some(&app.user(1)),
        json!({ "status": "reviewing" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json(
        &app,
        "/api/v1/alerts/1/status",
        Some(&app.admin()),
        json!({ "status": "reviewing" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
