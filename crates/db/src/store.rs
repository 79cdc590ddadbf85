//! [`ParkingStore`] over PostgreSQL.
//!
//! Each command runs in one transaction. Rows the command depends on are
//! locked with `SELECT ... FOR UPDATE` (spots before wallets, spots in ID
//! order) and the buffered-window exclusion constraint backs the in-code
//! conflict check. Returning early without `commit` rolls the unit back.

use async_trait::async_trait;
use klyra_core::alert::{NewAlert, SecurityAlert};
use klyra_core::booking::{ensure_extendable, find_conflict, Booking, ExtensionReceipt, NewBooking};
use klyra_core::coupon::{after_redemption, ensure_redeemable, Coupon, NewCoupon};
use klyra_core::error::CoreError;
use klyra_core::notification::{completed_with_debt_notice, penalty_notice, Notification};
use klyra_core::overstay::state_machine;
use klyra_core::spot::{NewSpot, ParkingSpot, SensorReading};
use klyra_core::status::{AlertStatus, OverstayState, TransactionKind};
use klyra_core::store::{
    Displacement, ExtensionCommand, FollowUpCascade, OverstayResolution, ParkingStore,
    PenaltyOutcome, StartCheck, StoreResult,
};
use klyra_core::types::{DbId, Money, Timestamp};
use klyra_core::wallet::{
    booking_debit_description, cancellation_rows, coupon_description, ensure_can_pay,
    extension_description, penalty_description, settle_credit, split_charge, top_up_description,
    CreditReceipt, NewTransaction, Transaction, WalletAccount,
};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::models::booking::into_bookings;
use crate::repositories::{
    AlertRepo, BookingRepo, CouponRepo, NotificationRepo, SensorReadingRepo, SpotRepo,
    TransactionRepo, WalletRepo,
};
use crate::{is_exclusion_violation, map_db_error, DbPool};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Transaction-scoped helpers
// ---------------------------------------------------------------------------

/// Post one ledger row and apply it to the wallet.
async fn post(
    conn: &mut PgConnection,
    row: NewTransaction,
    now: Timestamp,
) -> Result<WalletAccount, CoreError> {
    let wallet = WalletRepo::apply_delta(&mut *conn, row.user_id, row.amount, row.debt_delta, now)
        .await
        .map_err(map_db_error)?;
    TransactionRepo::create(&mut *conn, &row, now)
        .await
        .map_err(map_db_error)?;
    Ok(wallet.into())
}

async fn locked_wallet(conn: &mut PgConnection, user_id: DbId) -> Result<(Money, Money), CoreError> {
    let wallet = WalletRepo::lock(&mut *conn, user_id)
        .await
        .map_err(map_db_error)?;
    Ok(wallet.map_or((Decimal::ZERO, Decimal::ZERO), |w| {
        (w.credit_balance, w.pending_debt)
    }))
}

async fn lock_spots(conn: &mut PgConnection, ids: &[DbId]) -> Result<Vec<ParkingSpot>, CoreError> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let rows = SpotRepo::lock_many(&mut *conn, &ids)
        .await
        .map_err(map_db_error)?;
    Ok(rows.into_iter().map(ParkingSpot::from).collect())
}

async fn active_on_spot(conn: &mut PgConnection, spot_id: DbId) -> Result<Vec<Booking>, CoreError> {
    let rows = BookingRepo::active_for_spot(&mut *conn, spot_id)
        .await
        .map_err(map_db_error)?;
    into_bookings(rows)
}

async fn credit(
    conn: &mut PgConnection,
    user_id: DbId,
    amount: Money,
    kind: TransactionKind,
    description: String,
    now: Timestamp,
) -> Result<CreditReceipt, CoreError> {
    let (_, debt) = locked_wallet(conn, user_id).await?;
    let split = settle_credit(debt, amount);
    let wallet = post(
        conn,
        NewTransaction {
            user_id,
            kind,
            amount: split.credited_to_balance,
            debt_delta: -split.applied_to_debt,
            description,
            booking_id: None,
        },
        now,
    )
    .await?;
    Ok(CreditReceipt {
        amount,
        applied_to_debt: split.applied_to_debt,
        credited_to_balance: split.credited_to_balance,
        credit_balance: wallet.credit_balance,
        pending_debt: wallet.pending_debt,
    })
}

/// Apply one displacement. `Ok(false)` when the booking or target moved.
async fn displace(
    conn: &mut PgConnection,
    displacement: &Displacement,
    now: Timestamp,
) -> Result<bool, CoreError> {
    match *displacement {
        Displacement::Reassign {
            booking_id,
            from_spot_id,
            to_spot_id,
        } => {
            let Some(row) = BookingRepo::lock(&mut *conn, booking_id)
                .await
                .map_err(map_db_error)?
            else {
                return Ok(false);
            };
            let booking = Booking::try_from(row)?;
            if !booking.is_active() || booking.spot_id != from_spot_id {
                return Ok(false);
            }
            if lock_spots(conn, &[to_spot_id]).await?.is_empty() {
                return Ok(false);
            }
            let on_target = active_on_spot(conn, to_spot_id).await?;
            if find_conflict(&on_target, booking.start_time, booking.end_time, Some(booking_id))
                .is_some()
            {
                return Ok(false);
            }
            match BookingRepo::reassign(&mut *conn, booking_id, from_spot_id, to_spot_id, now).await
            {
                Ok(moved) => Ok(moved),
                Err(err) if is_exclusion_violation(&err) => Ok(false),
                Err(err) => Err(map_db_error(err)),
            }
        }
        Displacement::Cancel {
            booking_id,
            from_spot_id,
            refund,
            compensation,
        } => {
            let Some(user_id) = BookingRepo::cancel(&mut *conn, booking_id, from_spot_id, now)
                .await
                .map_err(map_db_error)?
            else {
                return Ok(false);
            };
            for row in cancellation_rows(user_id, booking_id, refund, compensation) {
                post(conn, row, now).await?;
            }
            Ok(true)
        }
    }
}

fn displacement_spots(displacements: &[Displacement]) -> Vec<DbId> {
    displacements
        .iter()
        .flat_map(|d| match *d {
            Displacement::Reassign {
                from_spot_id,
                to_spot_id,
                ..
            } => vec![from_spot_id, to_spot_id],
            Displacement::Cancel { from_spot_id, .. } => vec![from_spot_id],
        })
        .collect()
}

async fn refresh_spots(conn: &mut PgConnection, spot_ids: &[DbId], now: Timestamp) -> StoreResult<()> {
    SpotRepo::refresh_availability(&mut *conn, now, Some(spot_ids))
        .await
        .map_err(map_db_error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ParkingStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ParkingStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(map_db_error)
    }

    // -- spots & sensors ----------------------------------------------------

    async fn insert_spot(&self, spot: NewSpot, now: Timestamp) -> StoreResult<ParkingSpot> {
        let row = SpotRepo::create(&self.pool, &spot, now)
            .await
            .map_err(map_db_error)?;
        tracing::info!(spot_id = row.id, spot_number = %row.spot_number, "Spot created");
        Ok(row.into())
    }

    async fn list_spots(&self) -> StoreResult<Vec<ParkingSpot>> {
        let rows = SpotRepo::list(&self.pool).await.map_err(map_db_error)?;
        Ok(rows.into_iter().map(ParkingSpot::from).collect())
    }

    async fn find_spot(&self, id: DbId) -> StoreResult<Option<ParkingSpot>> {
        let row = SpotRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(ParkingSpot::from))
    }

    async fn record_reading(&self, reading: SensorReading) -> StoreResult<SensorReading> {
        let row = SensorReadingRepo::upsert(&self.pool, &reading)
            .await
            .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn find_reading(&self, sensor_id: &str) -> StoreResult<Option<SensorReading>> {
        let row = SensorReadingRepo::find(&self.pool, sensor_id)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(SensorReading::from))
    }

    async fn list_readings(&self) -> StoreResult<Vec<SensorReading>> {
        let rows = SensorReadingRepo::list(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(SensorReading::from).collect())
    }

    async fn refresh_availability(&self, now: Timestamp) -> StoreResult<u64> {
        SpotRepo::refresh_availability(&self.pool, now, None)
            .await
            .map_err(map_db_error)
    }

    // -- bookings -----------------------------------------------------------

    async fn find_booking(&self, id: DbId) -> StoreResult<Option<Booking>> {
        let row = BookingRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings_for_user(
        &self,
        user_id: DbId,
        active_only: bool,
    ) -> StoreResult<Vec<Booking>> {
        let rows = BookingRepo::list_for_user(&self.pool, user_id, active_only)
            .await
            .map_err(map_db_error)?;
        into_bookings(rows)
    }

    async fn list_bookings_for_spot(&self, spot_id: DbId) -> StoreResult<Vec<Booking>> {
        let rows = BookingRepo::list_for_spot(&self.pool, spot_id)
            .await
            .map_err(map_db_error)?;
        into_bookings(rows)
    }

    async fn active_bookings_for_spot(&self, spot_id: DbId) -> StoreResult<Vec<Booking>> {
        let rows = BookingRepo::active_for_spot(&self.pool, spot_id)
            .await
            .map_err(map_db_error)?;
        into_bookings(rows)
    }

    async fn list_active_bookings(&self) -> StoreResult<Vec<Booking>> {
        let rows = BookingRepo::list_active(&self.pool)
            .await
            .map_err(map_db_error)?;
        into_bookings(rows)
    }

    async fn bookings_pending_start_validation(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> StoreResult<Vec<Booking>> {
        let rows = BookingRepo::pending_start_validation(&self.pool, from, to)
            .await
            .map_err(map_db_error)?;
        into_bookings(rows)
    }

    async fn commit_booking(&self, new: NewBooking, now: Timestamp) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let spot = lock_spots(&mut tx, &[new.spot_id])
            .await?
            .into_iter()
            .next()
            .ok_or(CoreError::NotFound {
                entity: "ParkingSpot",
                id: new.spot_id,
            })?;

        let existing = active_on_spot(&mut tx, spot.id).await?;
        if find_conflict(&existing, new.start_time, new.end_time, None).is_some() {
            return Err(CoreError::slot_conflict(&spot.spot_number));
        }

        let (balance, _) = locked_wallet(&mut tx, new.user_id).await?;
        ensure_can_pay(balance, new.total_cost)?;

        let booking: Booking = match BookingRepo::create(&mut *tx, &new, now).await {
            Ok(row) => row.try_into()?,
            Err(err) if is_exclusion_violation(&err) => {
                return Err(CoreError::slot_conflict(&spot.spot_number));
            }
            Err(err) => return Err(map_db_error(err)),
        };

        post(
            &mut tx,
            NewTransaction {
                user_id: booking.user_id,
                kind: TransactionKind::BookingDebit,
                amount: -booking.total_cost,
                debt_delta: Decimal::ZERO,
                description: booking_debit_description(&spot.spot_number),
                booking_id: Some(booking.id),
            },
            now,
        )
        .await?;
        refresh_spots(&mut tx, &[spot.id], now).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(booking)
    }

    async fn commit_extension(
        &self,
        command: ExtensionCommand,
        now: Timestamp,
    ) -> StoreResult<ExtensionReceipt> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Peek at the spot first so locks are taken spot-before-booking.
        let spot_id = BookingRepo::find_by_id(&mut *tx, command.booking_id)
            .await
            .map_err(map_db_error)?
            .map(|row| row.spot_id)
            .ok_or(CoreError::NotFound {
                entity: "Booking",
                id: command.booking_id,
            })?;
        let spot = lock_spots(&mut tx, &[spot_id])
            .await?
            .into_iter()
            .next()
            .ok_or(CoreError::NotFound {
                entity: "ParkingSpot",
                id: spot_id,
            })?;

        let booking: Booking = BookingRepo::lock(&mut *tx, command.booking_id)
            .await
            .map_err(map_db_error)?
            .ok_or(CoreError::NotFound {
                entity: "Booking",
                id: command.booking_id,
            })?
            .try_into()?;
        if booking.user_id != command.user_id {
            return Err(CoreError::Forbidden(
                "Only the booking owner can extend it".to_string(),
            ));
        }
        if booking.spot_id != spot.id {
            return Err(CoreError::Transient(
                "Booking moved while extending; please retry".to_string(),
            ));
        }
        ensure_extendable(&booking)?;

        let new_end = booking.end_time + chrono::Duration::hours(command.hours);
        let existing = active_on_spot(&mut tx, spot.id).await?;
        if find_conflict(&existing, booking.start_time, new_end, Some(booking.id)).is_some() {
            return Err(CoreError::slot_conflict(&spot.spot_number));
        }

        let (balance, _) = locked_wallet(&mut tx, booking.user_id).await?;
        ensure_can_pay(balance, command.cost)?;

        match BookingRepo::extend(&mut *tx, booking.id, new_end, command.cost, now).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(CoreError::Transient(
                    "Booking changed while extending; please retry".to_string(),
                ));
            }
            Err(err) if is_exclusion_violation(&err) => {
                return Err(CoreError::slot_conflict(&spot.spot_number));
            }
            Err(err) => return Err(map_db_error(err)),
        }

        post(
            &mut tx,
            NewTransaction {
                user_id: booking.user_id,
                kind: TransactionKind::ExtensionDebit,
                amount: -command.cost,
                debt_delta: Decimal::ZERO,
                description: extension_description(command.hours),
                booking_id: Some(booking.id),
            },
            now,
        )
        .await?;
        refresh_spots(&mut tx, &[spot.id], now).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(ExtensionReceipt {
            booking_id: booking.id,
            cost: command.cost,
            new_end_time: new_end,
            extension_hours: command.hours,
        })
    }

    async fn record_arrival(&self, booking_id: DbId, at: Timestamp) -> StoreResult<bool> {
        BookingRepo::record_arrival(&self.pool, booking_id, at)
            .await
            .map_err(map_db_error)
    }

    async fn transition_overstay(
        &self,
        booking_id: DbId,
        from: OverstayState,
        to: OverstayState,
        now: Timestamp,
    ) -> StoreResult<bool> {
        state_machine::validate_transition(from, to).map_err(CoreError::Validation)?;
        BookingRepo::transition_overstay(&self.pool, booking_id, from, to, now)
            .await
            .map_err(map_db_error)
    }

    async fn validate_start(&self, check: StartCheck, now: Timestamp) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut spots = vec![check.expected_spot_id];
        spots.extend(displacement_spots(check.displacement.as_slice()));
        lock_spots(&mut tx, &spots).await?;

        let Some(row) = BookingRepo::lock(&mut *tx, check.booking_id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(false);
        };
        let booking = Booking::try_from(row)?;
        if !booking.is_active()
            || booking.start_validated_at.is_some()
            || booking.spot_id != check.expected_spot_id
        {
            return Ok(false);
        }

        if let Some(displacement) = &check.displacement {
            if !displace(&mut tx, displacement, now).await? {
                return Ok(false);
            }
        }
        BookingRepo::mark_start_validated(&mut *tx, booking.id, now)
            .await
            .map_err(map_db_error)?;
        for notice in &check.notifications {
            NotificationRepo::create_once(&mut *tx, notice, now)
                .await
                .map_err(map_db_error)?;
        }
        refresh_spots(&mut tx, &spots, now).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }

    async fn resolve_overstay(
        &self,
        resolution: OverstayResolution,
        now: Timestamp,
    ) -> StoreResult<Option<PenaltyOutcome>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut spots = vec![resolution.spot_id];
        spots.extend(displacement_spots(&resolution.cascade));
        lock_spots(&mut tx, &spots).await?;

        let Some(row) = BookingRepo::lock(&mut *tx, resolution.booking_id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let booking = Booking::try_from(row)?;
        if !booking.is_active()
            || booking.spot_id != resolution.spot_id
            || booking.overstay_state != OverstayState::Overstaying
            || !state_machine::can_transition(booking.overstay_state, resolution.final_state)
        {
            return Ok(None);
        }

        for displacement in &resolution.cascade {
            if !displace(&mut tx, displacement, now).await? {
                tracing::debug!(
                    booking_id = displacement.booking_id(),
                    "Cascade target moved, rolling back resolution",
                );
                return Ok(None);
            }
        }

        let (balance, _) = locked_wallet(&mut tx, resolution.user_id).await?;
        let charge = split_charge(balance, resolution.penalty);
        let wallet = post(
            &mut tx,
            NewTransaction {
                user_id: resolution.user_id,
                kind: TransactionKind::OverstayPenalty,
                amount: -charge.from_balance,
                debt_delta: charge.to_debt,
                description: penalty_description(booking.id, resolution.overstay_minutes),
                booking_id: Some(booking.id),
            },
            now,
        )
        .await?;

        let recorded = BookingRepo::record_resolution(
            &mut *tx,
            booking.id,
            resolution.final_state,
            resolution.penalty,
            (!charge.to_debt.is_zero()).then_some(charge.to_debt),
            now,
        )
        .await
        .map_err(map_db_error)?;
        if !recorded {
            return Ok(None);
        }

        let penalty = penalty_notice(
            resolution.user_id,
            booking.id,
            resolution.overstay_minutes,
            resolution.penalty,
            charge.to_debt,
        );
        for notice in resolution.notifications.iter().chain(std::iter::once(&penalty)) {
            NotificationRepo::create_once(&mut *tx, notice, now)
                .await
                .map_err(map_db_error)?;
        }
        refresh_spots(&mut tx, &spots, now).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some(PenaltyOutcome {
            charge,
            pending_debt: wallet.pending_debt,
        }))
    }

    async fn displace_blocked(
        &self,
        follow_up: FollowUpCascade,
        now: Timestamp,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut spots = vec![follow_up.spot_id];
        spots.extend(displacement_spots(&follow_up.cascade));
        lock_spots(&mut tx, &spots).await?;

        let Some(row) = BookingRepo::lock(&mut *tx, follow_up.overstayer_id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(false);
        };
        let overstayer = Booking::try_from(row)?;
        if !overstayer.is_active()
            || overstayer.spot_id != follow_up.spot_id
            || !state_machine::is_resolved(overstayer.overstay_state)
        {
            return Ok(false);
        }

        for displacement in &follow_up.cascade {
            if !displace(&mut tx, displacement, now).await? {
                tracing::debug!(
                    booking_id = displacement.booking_id(),
                    "Follow-up target moved, rolling back cascade",
                );
                return Ok(false);
            }
        }
        for notice in &follow_up.notifications {
            NotificationRepo::create_once(&mut *tx, notice, now)
                .await
                .map_err(map_db_error)?;
        }
        refresh_spots(&mut tx, &spots, now).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }

    async fn complete_booking(
        &self,
        booking_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Option<Money>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let Some((user_id, spot_id)) = BookingRepo::complete(&mut *tx, booking_id, now)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let debt = WalletRepo::find(&mut *tx, user_id)
            .await
            .map_err(map_db_error)?
            .map_or(Decimal::ZERO, |w| w.pending_debt);
        if debt > Decimal::ZERO {
            NotificationRepo::create_once(
                &mut *tx,
                &completed_with_debt_notice(user_id, booking_id, debt),
                now,
            )
            .await
            .map_err(map_db_error)?;
        }
        refresh_spots(&mut tx, &[spot_id], now).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some(debt))
    }

    // -- wallet & coupons ---------------------------------------------------

    async fn find_wallet(&self, user_id: DbId) -> StoreResult<Option<WalletAccount>> {
        let row = WalletRepo::find(&self.pool, user_id)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(WalletAccount::from))
    }

    async fn list_transactions(&self, user_id: DbId, limit: i64) -> StoreResult<Vec<Transaction>> {
        let rows = TransactionRepo::list_for_user(&self.pool, user_id, limit)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn top_up(
        &self,
        user_id: DbId,
        amount: Money,
        now: Timestamp,
    ) -> StoreResult<CreditReceipt> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let receipt = credit(
            &mut tx,
            user_id,
            amount,
            TransactionKind::TopUp,
            top_up_description(amount),
            now,
        )
        .await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(receipt)
    }

    async fn insert_coupon(&self, coupon: NewCoupon, now: Timestamp) -> StoreResult<Coupon> {
        let row = CouponRepo::create(&self.pool, &coupon, now)
            .await
            .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn find_coupon(&self, code: &str) -> StoreResult<Option<Coupon>> {
        let row = CouponRepo::find_by_code(&self.pool, code)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Coupon::from))
    }

    async fn redeem_coupon(
        &self,
        user_id: DbId,
        code: &str,
        now: Timestamp,
    ) -> StoreResult<CreditReceipt> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let coupon: Coupon = CouponRepo::lock_by_code(&mut *tx, code)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::CouponNotFound(code.to_string()))?
            .into();
        ensure_redeemable(&coupon)?;
        let (used_count, is_active) = after_redemption(&coupon);
        CouponRepo::record_use(&mut *tx, coupon.id, used_count, is_active)
            .await
            .map_err(map_db_error)?;

        let receipt = credit(
            &mut tx,
            user_id,
            coupon.amount,
            TransactionKind::CouponRedemption,
            coupon_description(&coupon.code),
            now,
        )
        .await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(receipt)
    }

    // -- notifications ------------------------------------------------------

    async fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let rows = NotificationRepo::list_for_user(&self.pool, user_id, unread_only)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_notification_read(&self, user_id: DbId, id: DbId) -> StoreResult<bool> {
        NotificationRepo::mark_read(&self.pool, id, user_id)
            .await
            .map_err(map_db_error)
    }

    // -- security alerts ----------------------------------------------------

    async fn insert_alert(&self, alert: NewAlert, now: Timestamp) -> StoreResult<SecurityAlert> {
        let row = AlertRepo::create(&self.pool, &alert, now)
            .await
            .map_err(map_db_error)?;
        row.try_into()
    }

    async fn find_alert(&self, id: DbId) -> StoreResult<Option<SecurityAlert>> {
        let row = AlertRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        row.map(SecurityAlert::try_from).transpose()
    }

    async fn list_alerts(&self, status: Option<AlertStatus>) -> StoreResult<Vec<SecurityAlert>> {
        let rows = AlertRepo::list(&self.pool, status)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(SecurityAlert::try_from).collect()
    }

    async fn update_alert_status(
        &self,
        id: DbId,
        from: AlertStatus,
        to: AlertStatus,
        now: Timestamp,
    ) -> StoreResult<bool> {
        AlertRepo::update_status(&self.pool, id, from, to, now)
            .await
            .map_err(map_db_error)
    }
}
