//! Booking creation and extension.

use klyra_core::booking::{
    is_imminent, prepare_booking, validate_extension_hours, Booking, BookingRequest,
    ExtensionReceipt,
};
use klyra_core::error::CoreError;
use klyra_core::spot::fresh_obstacle;
use klyra_core::store::ExtensionCommand;
use klyra_core::types::{DbId, Timestamp};

use super::ParkingEngine;

impl ParkingEngine {
    /// Validate, price and commit a booking.
    ///
    /// A booking starting within the imminent window is checked against the
    /// spot's live sensor and stored as already validated.
    pub async fn create_booking(
        &self,
        request: BookingRequest,
        now: Timestamp,
    ) -> Result<Booking, CoreError> {
        let mut new = prepare_booking(&request, &self.policy, now)?;

        let spot = self
            .store
            .find_spot(new.spot_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ParkingSpot",
                id: new.spot_id,
            })?;

        if is_imminent(new.start_time, now) {
            let reading = self.reading_for(spot.sensor_id.as_deref()).await?;
            if fresh_obstacle(reading.as_ref(), now) {
                tracing::info!(
                    spot_id = spot.id,
                    spot_number = %spot.spot_number,
                    "Imminent booking rejected, spot occupied",
                );
                return Err(CoreError::SpotOccupied {
                    spot_number: spot.spot_number,
                });
            }
            new.start_validated = true;
        }

        let booking = self.store.commit_booking(new, now).await?;
        tracing::info!(
            booking_id = booking.id,
            user_id = booking.user_id,
            spot_id = booking.spot_id,
            total_cost = %booking.total_cost,
            "Booking created",
        );
        Ok(booking)
    }

    /// Extend the caller's active booking by whole hours.
    pub async fn extend_booking(
        &self,
        user_id: DbId,
        booking_id: DbId,
        hours: i64,
        now: Timestamp,
    ) -> Result<ExtensionReceipt, CoreError> {
        validate_extension_hours(hours)?;
        let cost = self.policy.extension_cost(hours);

        let receipt = self
            .store
            .commit_extension(
                ExtensionCommand {
                    booking_id,
                    user_id,
                    hours,
                    cost,
                },
                now,
            )
            .await?;
        tracing::info!(
            booking_id,
            user_id,
            hours,
            cost = %cost,
            new_end_time = %receipt.new_end_time,
            "Booking extended",
        );
        Ok(receipt)
    }

    /// Read a booking visible to the caller (owner or admin).
    pub async fn booking_for(
        &self,
        user_id: DbId,
        is_admin: bool,
        booking_id: DbId,
    ) -> Result<Booking, CoreError> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Booking",
                id: booking_id,
            })?;
        if !is_admin && booking.user_id != user_id {
            return Err(CoreError::Forbidden(
                "You can only view your own bookings".to_string(),
            ));
        }
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use klyra_core::booking::BookingDuration;
    use klyra_core::store::ParkingStore;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::engine::test_support::{at, engine, fund, reading, spot};

    fn request(spot_id: DbId, start: Timestamp, hours: i64) -> BookingRequest {
        BookingRequest {
            user_id: 1,
            spot_id,
            vehicle_number: " ka01ab1234 ".to_string(),
            start_time: start,
            duration: BookingDuration::Hours(hours),
        }
    }

    #[tokio::test]
    async fn create_booking_debits_cost() {
        let (engine, store) = engine();
        let a1 = spot(&store, "A1", "Level 1").await;
        fund(&store, 1, dec!(200)).await;

        let booking = engine
            .create_booking(request(a1.id, at(10, 0), 2), at(9, 0))
            .await
            .unwrap();

        assert_eq!(booking.vehicle_number, "KA01AB1234");
        assert_eq!(booking.total_cost, dec!(100));
        assert!(booking.start_validated_at.is_none());
        let wallet = store.find_wallet(1).await.unwrap().unwrap();
        assert_eq!(wallet.credit_balance, dec!(100));
    }

    #[tokio::test]
    async fn insufficient_balance_leaves_no_trace() {
        let (engine, store) = engine();
        let a1 = spot(&store, "A1", "Level 1").await;
        fund(&store, 1, dec!(30)).await;

        let err = engine
            .create_booking(request(a1.id, at(10, 0), 1), at(9, 0))
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::InsufficientBalance { .. });
        assert!(store.list_bookings_for_user(1, false).await.unwrap().is_empty());
        assert_eq!(store.ledger(1).await.len(), 1);
    }

    #[tokio::test]
    async fn imminent_booking_on_occupied_spot_is_rejected() {
        let (engine, store) = engine();
        let a1 = spot(&store, "A1", "Level 1").await;
        fund(&store, 1, dec!(200)).await;
        reading(&store, &a1, true, at(9, 59)).await;

        let err = engine
            .create_booking(request(a1.id, at(10, 3), 1), at(10, 0))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::SpotOccupied { spot_number } if spot_number == "A1");
    }

    #[tokio::test]
    async fn stale_obstacle_does_not_block_imminent_booking() {
        let (engine, store) = engine();
        let a1 = spot(&store, "A1", "Level 1").await;
        fund(&store, 1, dec!(200)).await;
        reading(&store, &a1, true, at(9, 50)).await;

        let booking = engine
            .create_booking(request(a1.id, at(10, 3), 1), at(10, 0))
            .await
            .unwrap();
        assert_eq!(booking.start_validated_at, Some(at(10, 0)));
    }

    #[tokio::test]
    async fn unknown_spot_is_not_found() {
        let (engine, _store) = engine();
        let err = engine
            .create_booking(request(99, at(10, 0), 1), at(9, 0))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "ParkingSpot", id: 99 });
    }

    #[tokio::test]
    async fn extension_respects_next_booking_buffer() {
        let (engine, store) = engine();
        let a1 = spot(&store, "A1", "Level 1").await;
        fund(&store, 1, dec!(500)).await;
        let first = engine
            .create_booking(request(a1.id, at(10, 0), 1), at(9, 0))
            .await
            .unwrap();
        engine
            .create_booking(request(a1.id, at(13, 0), 1), at(9, 0))
            .await
            .unwrap();

        let receipt = engine.extend_booking(1, first.id, 1, at(9, 30)).await.unwrap();
        assert_eq!(receipt.new_end_time, at(12, 0));
        assert_eq!(receipt.cost, dec!(50));

        let err = engine
            .extend_booking(1, first.id, 1, at(9, 31))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::BookingConflict(_));
        let stored = store.find_booking(first.id).await.unwrap().unwrap();
        assert_eq!(stored.end_time, at(10, 0) + Duration::hours(2));
    }

    #[tokio::test]
    async fn only_owner_extends() {
        let (engine, store) = engine();
        let a1 = spot(&store, "A1", "Level 1").await;
        fund(&store, 1, dec!(500)).await;
        let booking = engine
            .create_booking(request(a1.id, at(10, 0), 1), at(9, 0))
            .await
            .unwrap();

        let err = engine
            .extend_booking(2, booking.id, 1, at(9, 30))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[tokio::test]
    async fn extension_hours_are_bounded() {
        let (engine, _store) = engine();
        let err = engine.extend_booking(1, 1, 25, at(9, 0)).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }
}
