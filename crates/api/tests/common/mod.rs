#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{DurationRound, Utc};
use http_body_util::BodyExt;
use klyra_api::auth::jwt::{generate_access_token, JwtConfig};
use klyra_api::config::{MonitorConfig, ServerConfig, StoreBackend};
use klyra_api::router::build_app_router;
use klyra_api::state::AppState;
use klyra_core::booking::{Booking, NewBooking};
use klyra_core::policy::EnginePolicy;
use klyra_core::spot::{NewSpot, ParkingSpot};
use klyra_core::status::TransactionKind;
use klyra_core::store::{MemoryStore, ParkingStore};
use klyra_core::types::{DbId, Money, Timestamp};
use klyra_core::wallet::NewTransaction;
use rust_decimal::Decimal;
use tower::ServiceExt;

pub const ADMIN_ID: DbId = 1000;
pub const SENSOR_ID: DbId = 2000;

/// Test configuration: in-memory store, default policy, fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "klyra-test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
        store_backend: StoreBackend::Memory,
        database_url: None,
        policy: EnginePolicy::default(),
        monitor: MonitorConfig {
            overstay_sweep_interval: Duration::from_secs(60),
            start_validation_interval: Duration::from_secs(30),
            tick_timeout: Duration::from_secs(20),
        },
    }
}

/// The app under test plus a handle on its store for seeding and asserts.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn token(&self, user_id: DbId, role: &str) -> String {
        generate_access_token(user_id, role, &self.config.jwt).unwrap()
    }

    pub fn user(&self, user_id: DbId) -> String {
        self.token(user_id, klyra_core::roles::ROLE_USER)
    }

    pub fn admin(&self) -> String {
        self.token(ADMIN_ID, klyra_core::roles::ROLE_ADMIN)
    }

    pub fn sensor(&self) -> String {
        self.token(SENSOR_ID, klyra_core::roles::ROLE_SENSOR)
    }
}

/// Build the full router (same middleware as production) over a fresh
/// in-memory store.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), config.clone());
    TestApp {
        router: build_app_router(state, &config),
        store,
        config,
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// The current minute, so seeded windows line up with the handlers' clock.
pub fn now_minute() -> Timestamp {
    Utc::now()
        .duration_trunc(chrono::Duration::minutes(1))
        .unwrap()
}

pub async fn seed_spot(store: &MemoryStore, number: &str, location: &str) -> ParkingSpot {
    store
        .insert_spot(
            NewSpot {
                spot_number: number.to_string(),
                location: location.to_string(),
                sensor_id: Some(format!("SENS-{number}")),
                camera_feed_url: None,
            },
            Utc::now(),
        )
        .await
        .unwrap()
}

pub async fn fund(store: &MemoryStore, user_id: DbId, amount: Money) {
    store
        .post_transaction(
            NewTransaction {
                user_id,
                kind: TransactionKind::TopUp,
                amount,
                debt_delta: Decimal::ZERO,
                description: "seed".to_string(),
                booking_id: None,
            },
            Utc::now(),
        )
        .await;
}

/// Insert a booking directly, bypassing request validation so windows may
/// lie in the past.
pub async fn seed_booking(
    store: &MemoryStore,
    user_id: DbId,
    spot_id: DbId,
    start: Timestamp,
    end: Timestamp,
    cost: Money,
) -> Booking {
    store
        .commit_booking(
            NewBooking {
                user_id,
                spot_id,
                vehicle_number: format!("KA01X{user_id}"),
                start_time: start,
                end_time: end,
                total_cost: cost,
                start_validated: true,
            },
            start - chrono::Duration::days(1),
        )
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: &TestApp,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put_json(
    app: &TestApp,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
