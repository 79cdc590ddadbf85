//! Security alerts filed by users against their bookings.

use klyra_core::alert::{validate_description, validate_status_change, NewAlert, SecurityAlert};
use klyra_core::error::CoreError;
use klyra_core::status::AlertStatus;
use klyra_core::types::{DbId, Timestamp};

use super::ParkingEngine;

impl ParkingEngine {
    /// File an alert against one of the caller's own bookings.
    pub async fn file_alert(
        &self,
        user_id: DbId,
        booking_id: DbId,
        description: &str,
        screenshot_ref: Option<String>,
        now: Timestamp,
    ) -> Result<SecurityAlert, CoreError> {
        let description = validate_description(description)?;
        let booking = self.booking_for(user_id, false, booking_id).await?;

        let alert = self
            .store
            .insert_alert(
                NewAlert {
                    user_id,
                    booking_id,
                    spot_id: booking.spot_id,
                    vehicle_number: booking.vehicle_number,
                    description,
                    screenshot_ref: screenshot_ref.filter(|s| !s.trim().is_empty()),
                },
                now,
            )
            .await?;
        tracing::warn!(
            alert_id = alert.id,
            user_id,
            booking_id,
            spot_id = alert.spot_id,
            "Security alert filed",
        );
        Ok(alert)
    }

    pub async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<SecurityAlert>, CoreError> {
        self.store.list_alerts(status).await
    }

    /// Move an alert forward (`pending -> reviewing -> resolved`).
    pub async fn advance_alert(
        &self,
        alert_id: DbId,
        to: AlertStatus,
        now: Timestamp,
    ) -> Result<SecurityAlert, CoreError> {
        let alert = self
            .store
            .find_alert(alert_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "SecurityAlert",
                id: alert_id,
            })?;
        validate_status_change(alert.status, to)?;

        if !self
            .store
            .update_alert_status(alert_id, alert.status, to, now)
            .await?
        {
            return Err(CoreError::Conflict(format!(
                "Alert {alert_id} was updated concurrently"
            )));
        }
        tracing::info!(alert_id, from = %alert.status, to = %to, "Alert status changed");

        Ok(SecurityAlert {
            status: to,
            updated_at: now,
            ..alert
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use klyra_core::booking::{BookingDuration, BookingRequest};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::engine::test_support::{at, engine, fund, spot};

    async fn booked(engine: &ParkingEngine, store: &klyra_core::store::MemoryStore) -> DbId {
        let a1 = spot(store, "A1", "Level 1").await;
        fund(store, 1, dec!(100)).await;
        engine
            .create_booking(
                BookingRequest {
                    user_id: 1,
                    spot_id: a1.id,
                    vehicle_number: "KA01AB1234".to_string(),
                    start_time: at(10, 0),
                    duration: BookingDuration::Hours(1),
                },
                at(9, 0),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn owner_files_alert_with_booking_details() {
        let (engine, store) = engine();
        let booking_id = booked(&engine, &store).await;

        let alert = engine
            .file_alert(1, booking_id, "  Scratch on the door ", None, at(10, 30))
            .await
            .unwrap();

        assert_eq!(alert.status, AlertStatus::Pending);
        assert_eq!(alert.description, "Scratch on the door");
        assert_eq!(alert.vehicle_number, "KA01AB1234");
        assert_eq!(engine.list_alerts(Some(AlertStatus::Pending)).await.unwrap().len(), 1);
        assert!(engine.list_alerts(Some(AlertStatus::Resolved)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_users_cannot_file_against_booking() {
        let (engine, store) = engine();
        let booking_id = booked(&engine, &store).await;

        let err = engine
            .file_alert(2, booking_id, "not mine", None, at(10, 30))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));

        let err = engine
            .file_alert(1, booking_id, "   ", None, at(10, 30))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn alerts_only_move_forward() {
        let (engine, store) = engine();
        let booking_id = booked(&engine, &store).await;
        let alert = engine
            .file_alert(1, booking_id, "Broken light", None, at(10, 30))
            .await
            .unwrap();

        let reviewing = engine
            .advance_alert(alert.id, AlertStatus::Reviewing, at(11, 0))
            .await
            .unwrap();
        assert_eq!(reviewing.status, AlertStatus::Reviewing);

        let err = engine
            .advance_alert(alert.id, AlertStatus::Pending, at(11, 5))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));

        engine
            .advance_alert(alert.id, AlertStatus::Resolved, at(11, 10))
            .await
            .unwrap();
        let err = engine
            .advance_alert(alert.id, AlertStatus::Resolved, at(11, 15))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }
}
