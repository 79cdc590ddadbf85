//! Background monitors driven against the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use common::{fund, now_minute, seed_booking, seed_spot, test_config};
use klyra_api::background::{overstay_sweep, start_validation, Scheduler};
use klyra_api::engine::ParkingEngine;
use klyra_core::booking::NewBooking;
use klyra_core::policy::EnginePolicy;
use klyra_core::spot::{NewSpot, SensorReading};
use klyra_core::status::BookingStatus;
use klyra_core::store::{MemoryStore, ParkingStore};
use rust_decimal_macros::dec;

fn engine(store: &Arc<MemoryStore>) -> Arc<ParkingEngine> {
    Arc::new(ParkingEngine::new(store.clone(), EnginePolicy::default()))
}

#[tokio::test]
async fn scheduler_completes_ended_bookings_and_stops() {
    let store = Arc::new(MemoryStore::new());
    let spot = store
        .insert_spot(
            NewSpot {
                spot_number: "D1".to_string(),
                location: "Open Air".to_string(),
                sensor_id: None,
                camera_feed_url: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();
    fund(&store, 1, dec!(50)).await;
    let start = now_minute() - Duration::hours(2);
    let booking = seed_booking(&store, 1, spot.id, start, start + Duration::hours(1), dec!(50)).await;

    let mut monitor = test_config().monitor;
    monitor.overstay_sweep_interval = StdDuration::from_secs(1);
    monitor.start_validation_interval = StdDuration::from_secs(1);
    let scheduler = Scheduler::start(engine(&store), &monitor);

    let mut status = BookingStatus::Active;
    for _ in 0..40 {
        status = store.find_booking(booking.id).await.unwrap().unwrap().status;
        if status == BookingStatus::Completed {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(50)).await;
    }
    assert_eq!(status, BookingStatus::Completed);

    tokio::time::timeout(StdDuration::from_secs(5), scheduler.shutdown(StdDuration::from_secs(2)))
        .await
        .expect("scheduler shuts down");
}

#[tokio::test]
async fn start_validation_tick_moves_booking_off_occupied_spot() {
    let store = Arc::new(MemoryStore::new());
    let a1 = seed_spot(&store, "A1", "Level 1").await;
    let a2 = seed_spot(&store, "A2", "Level 1").await;
    fund(&store, 1, dec!(50)).await;

    let start = Utc::now() + Duration::minutes(2);
    let booking = store
        .commit_booking(
            NewBooking {
                user_id: 1,
                spot_id: a1.id,
                vehicle_number: "KA01AB1234".to_string(),
                start_time: start,
                end_time: start + Duration::hours(1),
                total_cost: dec!(50),
                start_validated: false,
            },
            Utc::now(),
        )
        .await
        .unwrap();
    store
        .record_reading(SensorReading {
            sensor_id: "SENS-A1".to_string(),
            obstacle: true,
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let engine = engine(&store);
    start_validation::tick(&engine, StdDuration::from_secs(5)).await;

    let moved = store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(moved.spot_id, a2.id);
    assert_eq!(moved.reassigned_from, Some(a1.id));
    assert!(moved.start_validated_at.is_some());

    // Already validated: a second tick leaves it alone.
    start_validation::tick(&engine, StdDuration::from_secs(5)).await;
    let again = store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(again.spot_id, a2.id);
}

#[tokio::test]
async fn overstay_tick_on_empty_store_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);

    overstay_sweep::tick(&engine, StdDuration::from_secs(5)).await;

    assert!(store.list_active_bookings().await.unwrap().is_empty());
}
