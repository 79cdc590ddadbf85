//! Checks run just before a booking starts: if the spot is physically
//! occupied the booking is moved to an equivalent spot, or cancelled with a
//! refund and compensation when none is free.

use klyra_core::booking::{is_imminent, Booking};
use klyra_core::error::CoreError;
use klyra_core::notification::{cancelled_notice, reassigned_notice, DisplacementCause};
use klyra_core::policy::imminent_window;
use klyra_core::reassignment::ReassignmentPlanner;
use klyra_core::spot::fresh_obstacle;
use klyra_core::store::{Displacement, StartCheck};
use klyra_core::types::{DbId, Money, Timestamp};
use serde::Serialize;

use super::ParkingEngine;

/// What a start check did to the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartAction {
    None,
    Reassigned,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartValidation {
    pub booking_id: DbId,
    pub action: StartAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_spot_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_spot_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation: Option<Money>,
}

impl StartValidation {
    fn none(booking_id: DbId) -> Self {
        Self {
            booking_id,
            action: StartAction::None,
            new_spot_id: None,
            new_spot_number: None,
            refund_amount: None,
            compensation: None,
        }
    }
}

impl ParkingEngine {
    /// Validate one booking's start.
    ///
    /// Inactive, already validated, or not-yet-due bookings are left alone.
    pub async fn validate_booking_start(
        &self,
        booking_id: DbId,
        now: Timestamp,
    ) -> Result<StartValidation, CoreError> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Booking",
                id: booking_id,
            })?;
        self.check_start(booking, now).await
    }

    /// Validate every active, unvalidated booking starting within the next
    /// few minutes. Failures are logged and the booking is retried on the
    /// next call.
    pub async fn validate_upcoming_starts(
        &self,
        now: Timestamp,
    ) -> Result<Vec<StartValidation>, CoreError> {
        let due = self
            .store
            .bookings_pending_start_validation(now, now + imminent_window())
            .await?;

        let mut results = Vec::with_capacity(due.len());
        for booking in due {
            let booking_id = booking.id;
            match self.check_start(booking, now).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(booking_id, error = %e, "Start validation failed");
                }
            }
        }
        Ok(results)
    }

    async fn check_start(
        &self,
        booking: Booking,
        now: Timestamp,
    ) -> Result<StartValidation, CoreError> {
        if !booking.is_active()
            || booking.start_validated_at.is_some()
            || !is_imminent(booking.start_time, now)
        {
            return Ok(StartValidation::none(booking.id));
        }

        let spot = self
            .store
            .find_spot(booking.spot_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "ParkingSpot",
                id: booking.spot_id,
            })?;
        let reading = self.reading_for(spot.sensor_id.as_deref()).await?;

        let mut result = StartValidation::none(booking.id);
        let mut check = StartCheck {
            booking_id: booking.id,
            expected_spot_id: spot.id,
            displacement: None,
            notifications: Vec::new(),
        };

        if fresh_obstacle(reading.as_ref(), now) {
            let snapshots = self.snapshots().await?;
            let mut planner = ReassignmentPlanner::new(snapshots, &self.policy, now);
            match planner.assign(&spot, &booking) {
                Some(target) => {
                    check.displacement = Some(Displacement::Reassign {
                        booking_id: booking.id,
                        from_spot_id: spot.id,
                        to_spot_id: target.id,
                    });
                    check.notifications.push(reassigned_notice(
                        booking.user_id,
                        booking.id,
                        target,
                        DisplacementCause::SpotOccupied,
                    ));
                    result.action = StartAction::Reassigned;
                    result.new_spot_id = Some(target.id);
                    result.new_spot_number = Some(target.spot_number.clone());
                }
                None => {
                    let refund = booking.total_cost;
                    let compensation = self.policy.cancellation_compensation;
                    check.displacement = Some(Displacement::Cancel {
                        booking_id: booking.id,
                        from_spot_id: spot.id,
                        refund,
                        compensation,
                    });
                    check.notifications.push(cancelled_notice(
                        booking.user_id,
                        booking.id,
                        refund,
                        compensation,
                        DisplacementCause::SpotOccupied,
                    ));
                    result.action = StartAction::Cancelled;
                    result.refund_amount = Some(refund);
                    result.compensation = Some(compensation);
                }
            }
        }

        if !self.store.validate_start(check, now).await? {
            tracing::debug!(booking_id = booking.id, "Start check lost a race, skipping");
            return Ok(StartValidation::none(booking.id));
        }

        match result.action {
            StartAction::None => {
                tracing::debug!(booking_id = booking.id, "Booking start validated");
            }
            StartAction::Reassigned => tracing::info!(
                booking_id = booking.id,
                from_spot_id = spot.id,
                to_spot_id = ?result.new_spot_id,
                "Booking reassigned, original spot occupied",
            ),
            StartAction::Cancelled => tracing::warn!(
                booking_id = booking.id,
                spot_id = spot.id,
                "Booking cancelled, spot occupied and no alternative free",
            ),
        }
        Ok(result)
    }
}
