//! `PgStore` against a real database: conflict protocol, ledger atomicity,
//! overstay resolution and follow-up cascades.

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use klyra_core::booking::NewBooking;
use klyra_core::coupon::NewCoupon;
use klyra_core::error::CoreError;
use klyra_core::notification::{reassigned_notice, DisplacementCause};
use klyra_core::spot::{NewSpot, ParkingSpot};
use klyra_core::status::{BookingStatus, NotificationKind, OverstayState, TransactionKind};
use klyra_core::store::{Displacement, FollowUpCascade, OverstayResolution, ParkingStore};
use klyra_core::types::{DbId, Timestamp};
use klyra_core::wallet::NewTransaction;
use klyra_db::repositories::{TransactionRepo, WalletRepo};
use klyra_db::PgStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(hour: u32, minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
}

async fn spot(store: &PgStore, number: &str, sensor: Option<&str>) -> ParkingSpot {
    store
        .insert_spot(
            NewSpot {
                spot_number: number.to_string(),
                location: "Level 1".to_string(),
                sensor_id: sensor.map(str::to_string),
                camera_feed_url: None,
            },
            at(8, 0),
        )
        .await
        .unwrap()
}

async fn fund(pool: &PgPool, user_id: DbId, amount: Decimal) {
    let row = NewTransaction {
        user_id,
        kind: TransactionKind::TopUp,
        amount,
        debt_delta: Decimal::ZERO,
        description: "seed".to_string(),
        booking_id: None,
    };
    WalletRepo::apply_delta(pool, user_id, amount, Decimal::ZERO, at(8, 0))
        .await
        .unwrap();
    TransactionRepo::create(pool, &row, at(8, 0)).await.unwrap();
}

fn one_hour(user_id: DbId, spot_id: DbId, start: Timestamp) -> NewBooking {
    NewBooking {
        user_id,
        spot_id,
        vehicle_number: "KA01AB1234".to_string(),
        start_time: start,
        end_time: start + Duration::hours(1),
        total_cost: dec!(50),
        start_validated: false,
    }
}

// ---------------------------------------------------------------------------
// Booking conflict protocol
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn commit_booking_debits_wallet_once(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", None).await;
    fund(&pool, 7, dec!(100)).await;

    let booking = store
        .commit_booking(one_hour(7, s.id, at(10, 0)), at(9, 0))
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Active);
    let wallet = store.find_wallet(7).await.unwrap().unwrap();
    assert_eq!(wallet.credit_balance, dec!(50));
    let rows = store.list_transactions(7, 10).await.unwrap();
    assert_eq!(rows[0].kind, TransactionKind::BookingDebit);
    assert_eq!(rows[0].description, "Parking Booking - A1");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn buffered_overlap_is_rejected(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", None).await;
    fund(&pool, 7, dec!(200)).await;

    store
        .commit_booking(one_hour(7, s.id, at(10, 0)), at(9, 0))
        .await
        .unwrap();
    // Starts within an hour of the 11:00 end, so the buffers meet.
    let err = store
        .commit_booking(one_hour(7, s.id, at(11, 30)), at(9, 0))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::BookingConflict(_));

    // Balance untouched by the rejected attempt.
    let wallet = store.find_wallet(7).await.unwrap().unwrap();
    assert_eq!(wallet.credit_balance, dec!(150));

    // Exactly one hour of gap clears both buffers.
    store
        .commit_booking(one_hour(7, s.id, at(12, 0)), at(9, 0))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn exclusion_constraint_backs_the_conflict_check(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", None).await;

    let insert = |start: Timestamp| {
        sqlx::query(
            "INSERT INTO bookings (user_id, spot_id, vehicle_number, start_time, end_time, total_cost) \
             VALUES (1, $1, 'X', $2, $3, 50)",
        )
        .bind(s.id)
        .bind(start)
        .bind(start + Duration::hours(1))
    };

    insert(at(10, 0)).execute(&pool).await.unwrap();
    let err = insert(at(11, 15)).execute(&pool).await.unwrap_err();
    assert!(klyra_db::is_exclusion_violation(&err));
    assert_matches!(klyra_db::map_db_error(err), CoreError::BookingConflict(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn insufficient_balance_writes_nothing(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", None).await;
    fund(&pool, 7, dec!(30)).await;

    let err = store
        .commit_booking(one_hour(7, s.id, at(10, 0)), at(9, 0))
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::InsufficientBalance { .. });
    assert!(store.list_bookings_for_user(7, false).await.unwrap().is_empty());
    assert_eq!(store.list_transactions(7, 10).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn coupon_repays_debt_first_and_is_single_use(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    WalletRepo::apply_delta(&pool, 7, Decimal::ZERO, dec!(120), at(8, 0))
        .await
        .unwrap();
    store
        .insert_coupon(
            NewCoupon {
                code: "WELCOME100".to_string(),
                amount: dec!(100),
                max_uses: 1,
                created_by: None,
            },
            at(8, 0),
        )
        .await
        .unwrap();

    let receipt = store.redeem_coupon(7, "WELCOME100", at(9, 0)).await.unwrap();
    assert_eq!(receipt.applied_to_debt, dec!(100));
    assert_eq!(receipt.pending_debt, dec!(20));
    assert_eq!(receipt.credit_balance, Decimal::ZERO);

    let err = store
        .redeem_coupon(7, "WELCOME100", at(9, 1))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::CouponExhausted(_));
}

// ---------------------------------------------------------------------------
// Overstay resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn resolution_moves_blocked_booking_and_charges_penalty(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", Some("sensor-a1")).await;
    let t = spot(&store, "A2", Some("sensor-a2")).await;
    fund(&pool, 1, dec!(50)).await;
    fund(&pool, 2, dec!(50)).await;

    let a = store
        .commit_booking(one_hour(1, s.id, at(10, 0)), at(9, 0))
        .await
        .unwrap();
    let b = store
        .commit_booking(one_hour(2, s.id, at(12, 0)), at(9, 0))
        .await
        .unwrap();
    assert!(store
        .transition_overstay(a.id, OverstayState::OnTime, OverstayState::Overstaying, at(12, 6))
        .await
        .unwrap());

    let outcome = store
        .resolve_overstay(
            OverstayResolution {
                booking_id: a.id,
                user_id: 1,
                spot_id: s.id,
                penalty: dec!(200),
                overstay_minutes: 66,
                cascade: vec![Displacement::Reassign {
                    booking_id: b.id,
                    from_spot_id: s.id,
                    to_spot_id: t.id,
                }],
                final_state: OverstayState::ResolvedViaReassignment,
                notifications: Vec::new(),
            },
            at(12, 6),
        )
        .await
        .unwrap()
        .expect("resolution applies");

    // Balance was spent on the booking, so the whole penalty becomes debt.
    assert_eq!(outcome.charge.from_balance, Decimal::ZERO);
    assert_eq!(outcome.pending_debt, dec!(200));

    let moved = store.find_booking(b.id).await.unwrap().unwrap();
    assert_eq!(moved.spot_id, t.id);
    assert_eq!(moved.reassigned_from, Some(s.id));
    assert_eq!(moved.total_cost, dec!(50));

    let resolved = store.find_booking(a.id).await.unwrap().unwrap();
    assert_eq!(resolved.overstay_state, OverstayState::ResolvedViaReassignment);
    assert_eq!(resolved.pending_debt, Some(dec!(200)));

    // A replay finds the booking already resolved and writes nothing.
    let replay = store
        .resolve_overstay(
            OverstayResolution {
                booking_id: a.id,
                user_id: 1,
                spot_id: s.id,
                penalty: dec!(200),
                overstay_minutes: 66,
                cascade: Vec::new(),
                final_state: OverstayState::ResolvedViaPenalty,
                notifications: Vec::new(),
            },
            at(12, 7),
        )
        .await
        .unwrap();
    assert!(replay.is_none());
    assert_eq!(store.find_wallet(1).await.unwrap().unwrap().pending_debt, dec!(200));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn complete_booking_is_idempotent(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", None).await;
    fund(&pool, 1, dec!(50)).await;
    let a = store
        .commit_booking(one_hour(1, s.id, at(10, 0)), at(9, 0))
        .await
        .unwrap();

    assert_eq!(
        store.complete_booking(a.id, at(11, 0)).await.unwrap(),
        Some(Decimal::ZERO)
    );
    assert_eq!(store.complete_booking(a.id, at(11, 1)).await.unwrap(), None);
    let done = store.find_booking(a.id).await.unwrap().unwrap();
    assert_eq!(done.status, BookingStatus::Completed);
    assert_eq!(done.overstay_state, OverstayState::Completed);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn follow_up_cascade_moves_booking_without_charging(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let s = spot(&store, "A1", Some("sensor-a1")).await;
    let t = spot(&store, "A2", Some("sensor-a2")).await;
    fund(&pool, 1, dec!(150)).await;
    fund(&pool, 2, dec!(50)).await;

    let a = store
        .commit_booking(one_hour(1, s.id, at(10, 0)), at(9, 0))
        .await
        .unwrap();
    let b = store
        .commit_booking(one_hour(2, s.id, at(12, 0)), at(9, 0))
        .await
        .unwrap();
    store
        .transition_overstay(a.id, OverstayState::OnTime, OverstayState::Overstaying, at(11, 6))
        .await
        .unwrap();
    store
        .resolve_overstay(
            OverstayResolution {
                booking_id: a.id,
                user_id: 1,
                spot_id: s.id,
                penalty: dec!(100),
                overstay_minutes: 6,
                cascade: Vec::new(),
                final_state: OverstayState::ResolvedViaPenalty,
                notifications: Vec::new(),
            },
            at(11, 6),
        )
        .await
        .unwrap()
        .expect("penalty applies");

    let follow_up = FollowUpCascade {
        overstayer_id: a.id,
        spot_id: s.id,
        cascade: vec![Displacement::Reassign {
            booking_id: b.id,
            from_spot_id: s.id,
            to_spot_id: t.id,
        }],
        notifications: vec![reassigned_notice(2, b.id, &t, DisplacementCause::PreviousOverstay)],
    };
    assert!(store.displace_blocked(follow_up.clone(), at(12, 6)).await.unwrap());

    let moved = store.find_booking(b.id).await.unwrap().unwrap();
    assert_eq!(moved.spot_id, t.id);
    assert_eq!(store.find_wallet(1).await.unwrap().unwrap().credit_balance, dec!(0));
    assert_eq!(store.list_transactions(1, 10).await.unwrap().len(), 3);

    let notices = store.list_notifications(2, false).await.unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::BookingReassigned);
    assert_eq!(notices[0].spot_id, Some(t.id));

    assert!(!store.displace_blocked(follow_up, at(12, 7)).await.unwrap());
}
