//! In-memory [`ParkingStore`] used by tests and local demos.
//!
//! All state sits behind one `tokio::sync::Mutex`, so every command is
//! serialised. Multi-step commands run against a draft copy that replaces the
//! live state only when the whole unit succeeded.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{
    Displacement, ExtensionCommand, FollowUpCascade, OverstayResolution, ParkingStore,
    PenaltyOutcome, StartCheck, StoreResult,
};
use crate::alert::{NewAlert, SecurityAlert};
use crate::booking::{ensure_extendable, find_conflict, Booking, ExtensionReceipt, NewBooking};
use crate::coupon::{after_redemption, ensure_redeemable, Coupon, NewCoupon};
use crate::error::CoreError;
use crate::notification::{completed_with_debt_notice, penalty_notice, NewNotification, Notification};
use crate::overstay::state_machine;
use crate::spot::{is_available_at, NewSpot, ParkingSpot, SensorReading};
use crate::status::{AlertStatus, BookingStatus, OverstayState, TransactionKind};
use crate::types::{DbId, Money, Timestamp};
use crate::wallet::{
    booking_debit_description, cancellation_rows, coupon_description, ensure_can_pay,
    extension_description, penalty_description, settle_credit, split_charge, top_up_description,
    CreditReceipt, NewTransaction, Transaction, WalletAccount,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post an arbitrary ledger row (seeding balances or debt).
    pub async fn post_transaction(&self, row: NewTransaction, now: Timestamp) -> Transaction {
        self.inner.lock().await.apply(row, now)
    }

    /// Every ledger row of a user, oldest first.
    pub async fn ledger(&self, user_id: DbId) -> Vec<Transaction> {
        let inner = self.inner.lock().await;
        inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default, Clone)]
struct Inner {
    last_id: DbId,
    spots: BTreeMap<DbId, ParkingSpot>,
    readings: BTreeMap<String, SensorReading>,
    bookings: BTreeMap<DbId, Booking>,
    wallets: HashMap<DbId, WalletAccount>,
    transactions: Vec<Transaction>,
    coupons: BTreeMap<DbId, Coupon>,
    notifications: Vec<Notification>,
    alerts: BTreeMap<DbId, SecurityAlert>,
}

impl Inner {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn spot(&self, id: DbId) -> StoreResult<&ParkingSpot> {
        self.spots.get(&id).ok_or(CoreError::NotFound {
            entity: "ParkingSpot",
            id,
        })
    }

    fn active_on_spot(&self, spot_id: DbId) -> impl Iterator<Item = &Booking> {
        self.bookings
            .values()
            .filter(move |b| b.spot_id == spot_id && b.is_active())
    }

    fn balance(&self, user_id: DbId) -> Money {
        self.wallets
            .get(&user_id)
            .map_or(Decimal::ZERO, |w| w.credit_balance)
    }

    fn debt(&self, user_id: DbId) -> Money {
        self.wallets
            .get(&user_id)
            .map_or(Decimal::ZERO, |w| w.pending_debt)
    }

    /// Apply one ledger row to its wallet, creating the wallet if needed.
    fn apply(&mut self, row: NewTransaction, now: Timestamp) -> Transaction {
        let wallet = self
            .wallets
            .entry(row.user_id)
            .or_insert_with(|| WalletAccount::empty(row.user_id, now));
        wallet.credit_balance += row.amount;
        wallet.pending_debt += row.debt_delta;
        wallet.updated_at = now;

        let tx = Transaction {
            id: self.next_id(),
            user_id: row.user_id,
            kind: row.kind,
            amount: row.amount,
            debt_delta: row.debt_delta,
            description: row.description,
            booking_id: row.booking_id,
            created_at: now,
        };
        self.transactions.push(tx.clone());
        tx
    }

    fn credit(
        &mut self,
        user_id: DbId,
        amount: Money,
        kind: TransactionKind,
        description: String,
        now: Timestamp,
    ) -> CreditReceipt {
        let split = settle_credit(self.debt(user_id), amount);
        self.apply(
            NewTransaction {
                user_id,
                kind,
                amount: split.credited_to_balance,
                debt_delta: -split.applied_to_debt,
                description,
                booking_id: None,
            },
            now,
        );
        CreditReceipt {
            amount,
            applied_to_debt: split.applied_to_debt,
            credited_to_balance: split.credited_to_balance,
            credit_balance: self.balance(user_id),
            pending_debt: self.debt(user_id),
        }
    }

    /// Write a notice unless one of the same kind exists for the booking and
    /// target spot.
    fn notify(&mut self, notice: NewNotification, now: Timestamp) {
        let duplicate = notice.booking_id.is_some()
            && self.notifications.iter().any(|n| {
                n.booking_id == notice.booking_id
                    && n.kind == notice.kind
                    && n.spot_id == notice.spot_id
            });
        if duplicate {
            return;
        }
        let id = self.next_id();
        self.notifications.push(Notification {
            id,
            user_id: notice.user_id,
            booking_id: notice.booking_id,
            spot_id: notice.spot_id,
            kind: notice.kind,
            title: notice.title,
            message: notice.message,
            is_read: false,
            created_at: now,
        });
    }

    fn refresh_spot(&mut self, spot_id: DbId, now: Timestamp) -> bool {
        let available = is_available_at(self.active_on_spot(spot_id), now);
        match self.spots.get_mut(&spot_id) {
            Some(spot) if spot.is_available != available => {
                spot.is_available = available;
                true
            }
            _ => false,
        }
    }

    /// Apply one displacement. `false` when the booking or target moved.
    fn displace(&mut self, displacement: &Displacement, now: Timestamp) -> bool {
        match *displacement {
            Displacement::Reassign {
                booking_id,
                from_spot_id,
                to_spot_id,
            } => {
                let Some(booking) = self.bookings.get(&booking_id) else {
                    return false;
                };
                if !booking.is_active() || booking.spot_id != from_spot_id {
                    return false;
                }
                if !self.spots.contains_key(&to_spot_id) {
                    return false;
                }
                let (start, end) = (booking.start_time, booking.end_time);
                if find_conflict(self.active_on_spot(to_spot_id), start, end, Some(booking_id))
                    .is_some()
                {
                    return false;
                }
                let Some(booking) = self.bookings.get_mut(&booking_id) else {
                    return false;
                };
                booking.spot_id = to_spot_id;
                booking.reassigned_from = booking.reassigned_from.or(Some(from_spot_id));
                booking.updated_at = now;
                self.refresh_spot(from_spot_id, now);
                self.refresh_spot(to_spot_id, now);
                true
            }
            Displacement::Cancel {
                booking_id,
                from_spot_id,
                refund,
                compensation,
            } => {
                let Some(booking) = self.bookings.get_mut(&booking_id) else {
                    return false;
                };
                if !booking.is_active() || booking.spot_id != from_spot_id {
                    return false;
                }
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(now);
                booking.updated_at = now;
                let user_id = booking.user_id;
                for row in cancellation_rows(user_id, booking_id, refund, compensation) {
                    self.apply(row, now);
                }
                self.refresh_spot(from_spot_id, now);
                true
            }
        }
    }

    fn validate_start(&mut self, check: StartCheck, now: Timestamp) -> bool {
        let Some(booking) = self.bookings.get(&check.booking_id) else {
            return false;
        };
        if !booking.is_active()
            || booking.start_validated_at.is_some()
            || booking.spot_id != check.expected_spot_id
        {
            return false;
        }
        if let Some(displacement) = &check.displacement {
            if !self.displace(displacement, now) {
                return false;
            }
        }
        if let Some(booking) = self.bookings.get_mut(&check.booking_id) {
            booking.start_validated_at = Some(now);
            booking.updated_at = now;
        }
        for notice in check.notifications {
            self.notify(notice, now);
        }
        true
    }

    fn resolve(&mut self, r: OverstayResolution, now: Timestamp) -> Option<PenaltyOutcome> {
        let booking = self.bookings.get(&r.booking_id)?;
        if !booking.is_active()
            || booking.spot_id != r.spot_id
            || booking.overstay_state != OverstayState::Overstaying
            || !state_machine::can_transition(booking.overstay_state, r.final_state)
        {
            return None;
        }

        for displacement in &r.cascade {
            if !self.displace(displacement, now) {
                return None;
            }
        }

        let charge = split_charge(self.balance(r.user_id), r.penalty);
        self.apply(
            NewTransaction {
                user_id: r.user_id,
                kind: TransactionKind::OverstayPenalty,
                amount: -charge.from_balance,
                debt_delta: charge.to_debt,
                description: penalty_description(r.booking_id, r.overstay_minutes),
                booking_id: Some(r.booking_id),
            },
            now,
        );

        let booking = self.bookings.get_mut(&r.booking_id)?;
        booking.overstay_state = r.final_state;
        booking.overstay_penalty = Some(r.penalty);
        booking.pending_debt = (!charge.to_debt.is_zero()).then_some(charge.to_debt);
        booking.updated_at = now;

        for notice in r.notifications {
            self.notify(notice, now);
        }
        self.notify(
            penalty_notice(
                r.user_id,
                r.booking_id,
                r.overstay_minutes,
                r.penalty,
                charge.to_debt,
            ),
            now,
        );
        self.refresh_spot(r.spot_id, now);

        Some(PenaltyOutcome {
            charge,
            pending_debt: self.debt(r.user_id),
        })
    }

    fn follow_up(&mut self, c: FollowUpCascade, now: Timestamp) -> bool {
        let Some(overstayer) = self.bookings.get(&c.overstayer_id) else {
            return false;
        };
        if !overstayer.is_active()
            || overstayer.spot_id != c.spot_id
            || !state_machine::is_resolved(overstayer.overstay_state)
        {
            return false;
        }
        for displacement in &c.cascade {
            if !self.displace(displacement, now) {
                return false;
            }
        }
        for notice in c.notifications {
            self.notify(notice, now);
        }
        self.refresh_spot(c.spot_id, now);
        true
    }
}

fn sort_newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl ParkingStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    // -- spots & sensors ----------------------------------------------------

    async fn insert_spot(&self, spot: NewSpot, now: Timestamp) -> StoreResult<ParkingSpot> {
        let mut inner = self.inner.lock().await;
        if inner.spots.values().any(|s| s.spot_number == spot.spot_number) {
            return Err(CoreError::Conflict(format!(
                "Spot {} already exists",
                spot.spot_number
            )));
        }
        if let Some(sensor_id) = &spot.sensor_id {
            if inner
                .spots
                .values()
                .any(|s| s.sensor_id.as_ref() == Some(sensor_id))
            {
                return Err(CoreError::Conflict(format!(
                    "Sensor {sensor_id} is already bound to a spot"
                )));
            }
        }
        let created = ParkingSpot {
            id: inner.next_id(),
            spot_number: spot.spot_number,
            location: spot.location,
            is_available: true,
            sensor_id: spot.sensor_id,
            camera_feed_url: spot.camera_feed_url,
            created_at: now,
        };
        inner.spots.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_spots(&self) -> StoreResult<Vec<ParkingSpot>> {
        let inner = self.inner.lock().await;
        let mut spots: Vec<ParkingSpot> = inner.spots.values().cloned().collect();
        spots.sort_by(|a, b| a.spot_number.cmp(&b.spot_number));
        Ok(spots)
    }

    async fn find_spot(&self, id: DbId) -> StoreResult<Option<ParkingSpot>> {
        Ok(self.inner.lock().await.spots.get(&id).cloned())
    }

    async fn record_reading(&self, reading: SensorReading) -> StoreResult<SensorReading> {
        let mut inner = self.inner.lock().await;
        inner
            .readings
            .insert(reading.sensor_id.clone(), reading.clone());
        Ok(reading)
    }

    async fn find_reading(&self, sensor_id: &str) -> StoreResult<Option<SensorReading>> {
        Ok(self.inner.lock().await.readings.get(sensor_id).cloned())
    }

    async fn list_readings(&self) -> StoreResult<Vec<SensorReading>> {
        Ok(self.inner.lock().await.readings.values().cloned().collect())
    }

    async fn refresh_availability(&self, now: Timestamp) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let ids: Vec<DbId> = inner.spots.keys().copied().collect();
        let changed = ids
            .into_iter()
            .filter(|id| inner.refresh_spot(*id, now))
            .count();
        Ok(changed as u64)
    }

    // -- bookings -----------------------------------------------------------

    async fn find_booking(&self, id: DbId) -> StoreResult<Option<Booking>> {
        Ok(self.inner.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings_for_user(
        &self,
        user_id: DbId,
        active_only: bool,
    ) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id && (!active_only || b.is_active()))
            .cloned()
            .collect();
        sort_newest_first(&mut bookings);
        Ok(bookings)
    }

    async fn list_bookings_for_spot(&self, spot_id: DbId) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.spot_id == spot_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.start_time, b.id));
        Ok(bookings)
    }

    async fn active_bookings_for_spot(&self, spot_id: DbId) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<Booking> = inner.active_on_spot(spot_id).cloned().collect();
        bookings.sort_by_key(|b| (b.start_time, b.id));
        Ok(bookings)
    }

    async fn list_active_bookings(&self) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .values()
            .filter(|b| b.is_active())
            .cloned()
            .collect())
    }

    async fn bookings_pending_start_validation(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut due: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| {
                b.is_active()
                    && b.start_validated_at.is_none()
                    && b.start_time >= from
                    && b.start_time <= to
            })
            .cloned()
            .collect();
        due.sort_by_key(|b| (b.start_time, b.id));
        Ok(due)
    }

    async fn commit_booking(&self, new: NewBooking, now: Timestamp) -> StoreResult<Booking> {
        let mut inner = self.inner.lock().await;
        let spot_number = inner.spot(new.spot_id)?.spot_number.clone();

        if find_conflict(
            inner.active_on_spot(new.spot_id),
            new.start_time,
            new.end_time,
            None,
        )
        .is_some()
        {
            return Err(CoreError::slot_conflict(&spot_number));
        }
        ensure_can_pay(inner.balance(new.user_id), new.total_cost)?;

        let booking = Booking {
            id: inner.next_id(),
            user_id: new.user_id,
            spot_id: new.spot_id,
            vehicle_number: new.vehicle_number,
            start_time: new.start_time,
            end_time: new.end_time,
            status: BookingStatus::Active,
            total_cost: new.total_cost,
            overstay_state: OverstayState::OnTime,
            overstay_penalty: None,
            pending_debt: None,
            reassigned_from: None,
            arrived_at: None,
            start_validated_at: new.start_validated.then_some(now),
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.bookings.insert(booking.id, booking.clone());
        inner.apply(
            NewTransaction {
                user_id: booking.user_id,
                kind: TransactionKind::BookingDebit,
                amount: -booking.total_cost,
                debt_delta: Decimal::ZERO,
                description: booking_debit_description(&spot_number),
                booking_id: Some(booking.id),
            },
            now,
        );
        inner.refresh_spot(booking.spot_id, now);
        Ok(booking)
    }

    async fn commit_extension(
        &self,
        command: ExtensionCommand,
        now: Timestamp,
    ) -> StoreResult<ExtensionReceipt> {
        let mut inner = self.inner.lock().await;
        let booking = inner
            .bookings
            .get(&command.booking_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Booking",
                id: command.booking_id,
            })?;
        if booking.user_id != command.user_id {
            return Err(CoreError::Forbidden(
                "Only the booking owner can extend it".to_string(),
            ));
        }
        ensure_extendable(&booking)?;

        let new_end = booking.end_time + chrono::Duration::hours(command.hours);
        if find_conflict(
            inner.active_on_spot(booking.spot_id),
            booking.start_time,
            new_end,
            Some(booking.id),
        )
        .is_some()
        {
            let spot_number = inner.spot(booking.spot_id)?.spot_number.clone();
            return Err(CoreError::slot_conflict(&spot_number));
        }
        ensure_can_pay(inner.balance(booking.user_id), command.cost)?;

        if let Some(stored) = inner.bookings.get_mut(&booking.id) {
            stored.end_time = new_end;
            stored.total_cost += command.cost;
            stored.updated_at = now;
        }
        inner.apply(
            NewTransaction {
                user_id: booking.user_id,
                kind: TransactionKind::ExtensionDebit,
                amount: -command.cost,
                debt_delta: Decimal::ZERO,
                description: extension_description(command.hours),
                booking_id: Some(booking.id),
            },
            now,
        );
        inner.refresh_spot(booking.spot_id, now);

        Ok(ExtensionReceipt {
            booking_id: booking.id,
            cost: command.cost,
            new_end_time: new_end,
            extension_hours: command.hours,
        })
    }

    async fn record_arrival(&self, booking_id: DbId, at: Timestamp) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.bookings.get_mut(&booking_id) {
            Some(b) if b.is_active() && b.arrived_at.is_none() => {
                b.arrived_at = Some(at);
                b.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_overstay(
        &self,
        booking_id: DbId,
        from: OverstayState,
        to: OverstayState,
        now: Timestamp,
    ) -> StoreResult<bool> {
        state_machine::validate_transition(from, to).map_err(CoreError::Validation)?;
        let mut inner = self.inner.lock().await;
        match inner.bookings.get_mut(&booking_id) {
            Some(b) if b.is_active() && b.overstay_state == from => {
                b.overstay_state = to;
                b.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn validate_start(&self, check: StartCheck, now: Timestamp) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let mut draft = inner.clone();
        if draft.validate_start(check, now) {
            *inner = draft;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn resolve_overstay(
        &self,
        resolution: OverstayResolution,
        now: Timestamp,
    ) -> StoreResult<Option<PenaltyOutcome>> {
        let mut inner = self.inner.lock().await;
        let mut draft = inner.clone();
        let outcome = draft.resolve(resolution, now);
        if outcome.is_some() {
            *inner = draft;
        }
        Ok(outcome)
    }

    async fn displace_blocked(
        &self,
        cascade: FollowUpCascade,
        now: Timestamp,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let mut draft = inner.clone();
        if draft.follow_up(cascade, now) {
            *inner = draft;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn complete_booking(
        &self,
        booking_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Option<Money>> {
        let mut inner = self.inner.lock().await;
        let (user_id, spot_id) = match inner.bookings.get_mut(&booking_id) {
            Some(b) if b.is_active() => {
                b.status = BookingStatus::Completed;
                b.overstay_state = OverstayState::Completed;
                b.completed_at = Some(now);
                b.updated_at = now;
                (b.user_id, b.spot_id)
            }
            _ => return Ok(None),
        };
        let debt = inner.debt(user_id);
        if debt > Decimal::ZERO {
            inner.notify(completed_with_debt_notice(user_id, booking_id, debt), now);
        }
        inner.refresh_spot(spot_id, now);
        Ok(Some(debt))
    }

    // -- wallet & coupons ---------------------------------------------------

    async fn find_wallet(&self, user_id: DbId) -> StoreResult<Option<WalletAccount>> {
        Ok(self.inner.lock().await.wallets.get(&user_id).cloned())
    }

    async fn list_transactions(&self, user_id: DbId, limit: i64) -> StoreResult<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn top_up(
        &self,
        user_id: DbId,
        amount: Money,
        now: Timestamp,
    ) -> StoreResult<CreditReceipt> {
        let mut inner = self.inner.lock().await;
        Ok(inner.credit(
            user_id,
            amount,
            TransactionKind::TopUp,
            top_up_description(amount),
            now,
        ))
    }

    async fn insert_coupon(&self, coupon: NewCoupon, now: Timestamp) -> StoreResult<Coupon> {
        let mut inner = self.inner.lock().await;
        if inner.coupons.values().any(|c| c.code == coupon.code) {
            return Err(CoreError::Conflict(format!(
                "Coupon code {} already exists",
                coupon.code
            )));
        }
        let created = Coupon {
            id: inner.next_id(),
            code: coupon.code,
            amount: coupon.amount,
            max_uses: coupon.max_uses,
            used_count: 0,
            is_active: true,
            created_by: coupon.created_by,
            created_at: now,
        };
        inner.coupons.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_coupon(&self, code: &str) -> StoreResult<Option<Coupon>> {
        let inner = self.inner.lock().await;
        Ok(inner.coupons.values().find(|c| c.code == code).cloned())
    }

    async fn redeem_coupon(
        &self,
        user_id: DbId,
        code: &str,
        now: Timestamp,
    ) -> StoreResult<CreditReceipt> {
        let mut inner = self.inner.lock().await;
        let coupon = inner
            .coupons
            .values_mut()
            .find(|c| c.code == code)
            .ok_or_else(|| CoreError::CouponNotFound(code.to_string()))?;
        ensure_redeemable(coupon)?;
        let (used_count, is_active) = after_redemption(coupon);
        coupon.used_count = used_count;
        coupon.is_active = is_active;
        let amount = coupon.amount;

        Ok(inner.credit(
            user_id,
            amount,
            TransactionKind::CouponRedemption,
            coupon_description(code),
            now,
        ))
    }

    // -- notifications ------------------------------------------------------

    async fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, user_id: DbId, id: DbId) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // -- security alerts ----------------------------------------------------

    async fn insert_alert(&self, alert: NewAlert, now: Timestamp) -> StoreResult<SecurityAlert> {
        let mut inner = self.inner.lock().await;
        let created = SecurityAlert {
            id: inner.next_id(),
            user_id: alert.user_id,
            booking_id: alert.booking_id,
            spot_id: alert.spot_id,
            vehicle_number: alert.vehicle_number,
            description: alert.description,
            screenshot_ref: alert.screenshot_ref,
            status: AlertStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.alerts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_alert(&self, id: DbId) -> StoreResult<Option<SecurityAlert>> {
        Ok(self.inner.lock().await.alerts.get(&id).cloned())
    }

    async fn list_alerts(&self, status: Option<AlertStatus>) -> StoreResult<Vec<SecurityAlert>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .alerts
            .values()
            .rev()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect())
    }

    async fn update_alert_status(
        &self,
        id: DbId,
        from: AlertStatus,
        to: AlertStatus,
        now: Timestamp,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.alerts.get_mut(&id) {
            Some(a) if a.status == from => {
                a.status = to;
                a.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
