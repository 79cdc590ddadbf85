//! Overstay sweep: arrivals, departures, and resolution of vehicles that
//! stayed past their booking.

use chrono::Duration;
use klyra_core::booking::Booking;
use klyra_core::error::CoreError;
use klyra_core::notification::{
    cancelled_notice, reassigned_notice, DisplacementCause, NewNotification,
};
use klyra_core::overstay::{
    beyond_grace, blocked_bookings, departed_bookings, overstay_minutes, plan_occupied,
    resolution_state, state_machine, CancellationRecord, CompletionRecord, OccupiedPlan,
    PenaltyRecord, ReassignmentRecord, SweepReport,
};
use klyra_core::reassignment::{ReassignmentPlanner, SpotSnapshot};
use klyra_core::spot::ParkingSpot;
use klyra_core::status::OverstayState;
use klyra_core::store::{Displacement, FollowUpCascade, OverstayResolution};
use klyra_core::types::{DbId, Timestamp};

use super::ParkingEngine;

/// Displacements planned for the bookings queued behind an overstayer.
#[derive(Default)]
struct Cascade {
    displacements: Vec<Displacement>,
    notifications: Vec<NewNotification>,
    reassignments: Vec<ReassignmentRecord>,
    cancellations: Vec<CancellationRecord>,
}

impl ParkingEngine {
    /// Sweep every spot once.
    ///
    /// A failing spot is logged and skipped; the next sweep picks it up again.
    pub async fn run_overstay_sweep(&self, now: Timestamp) -> Result<SweepReport, CoreError> {
        let snapshots = self.snapshots().await?;
        let mut planner = ReassignmentPlanner::new(snapshots.clone(), &self.policy, now);

        let mut report = SweepReport::default();
        for snap in &snapshots {
            match self.sweep_spot(snap, &mut planner, now).await {
                Ok(spot_report) => report.merge(spot_report),
                Err(e) => {
                    tracing::error!(spot_id = snap.spot.id, error = %e, "Overstay check failed");
                }
            }
        }

        let changed = self.store.refresh_availability(now).await?;
        if !report.is_empty() || changed > 0 {
            tracing::info!(
                processed = report.processed_count,
                reassigned = report.reassignments.len(),
                cancelled = report.cancellations.len(),
                completed = report.completions.len(),
                arrivals = report.arrivals,
                availability_changed = changed,
                "Overstay sweep finished",
            );
        }
        Ok(report)
    }

    /// Run the sweep logic for one spot only.
    pub async fn check_spot_overstay(
        &self,
        spot_id: DbId,
        now: Timestamp,
    ) -> Result<SweepReport, CoreError> {
        let snapshots = self.snapshots().await?;
        let snap = snapshots
            .iter()
            .find(|s| s.spot.id == spot_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "ParkingSpot",
                id: spot_id,
            })?;
        let mut planner = ReassignmentPlanner::new(snapshots, &self.policy, now);
        self.sweep_spot(&snap, &mut planner, now).await
    }

    async fn sweep_spot(
        &self,
        snap: &SpotSnapshot,
        planner: &mut ReassignmentPlanner<'_>,
        now: Timestamp,
    ) -> Result<SweepReport, CoreError> {
        // Without a sensor only the clock can end a booking.
        if snap.spot.sensor_id.is_none() {
            let ended: Vec<&Booking> = snap
                .bookings
                .iter()
                .filter(|b| b.is_active() && b.has_ended(now))
                .collect();
            return self.complete_all(ended, now).await;
        }

        let Some(reading) = snap.reading.as_ref().filter(|r| r.is_fresh(now)) else {
            return Ok(SweepReport::default());
        };

        if !reading.obstacle {
            return self
                .complete_all(departed_bookings(&snap.bookings, now), now)
                .await;
        }

        let mut report = SweepReport::default();
        match plan_occupied(&snap.bookings, now) {
            OccupiedPlan::Idle => {}
            OccupiedPlan::Arrival { booking_id } => {
                if self.store.record_arrival(booking_id, now).await? {
                    tracing::debug!(booking_id, spot_id = snap.spot.id, "Arrival recorded");
                    report.arrivals += 1;
                }
            }
            OccupiedPlan::Overstay { booking, overstay } => {
                report = self
                    .handle_overstay(&snap.spot, &snap.bookings, booking, overstay, planner, now)
                    .await?;
            }
        }
        Ok(report)
    }

    async fn handle_overstay(
        &self,
        spot: &ParkingSpot,
        bookings: &[Booking],
        overstayer: Booking,
        overstay: Duration,
        planner: &mut ReassignmentPlanner<'_>,
        now: Timestamp,
    ) -> Result<SweepReport, CoreError> {
        let mut report = SweepReport::default();
        let mut state = overstayer.overstay_state;

        if state == OverstayState::OnTime {
            let moved = self
                .store
                .transition_overstay(
                    overstayer.id,
                    OverstayState::OnTime,
                    OverstayState::Overstaying,
                    now,
                )
                .await?;
            if !moved {
                return Ok(report);
            }
            tracing::info!(
                booking_id = overstayer.id,
                spot_id = spot.id,
                overstay_secs = overstay.num_seconds(),
                "Overstay detected",
            );
            state = OverstayState::Overstaying;
        }

        if state_machine::is_resolved(state) {
            return self
                .displace_still_blocked(spot, bookings, &overstayer, planner, now)
                .await;
        }
        if state != OverstayState::Overstaying || !beyond_grace(overstay) {
            return Ok(report);
        }

        let penalty = self.policy.overstay_penalty(overstay);
        let minutes = overstay_minutes(overstay);
        let Cascade {
            displacements,
            notifications,
            reassignments,
            cancellations,
        } = self.plan_cascade(spot, blocked_bookings(bookings, &overstayer, now), planner);

        let final_state = resolution_state(reassignments.len(), cancellations.len());
        let resolution = OverstayResolution {
            booking_id: overstayer.id,
            user_id: overstayer.user_id,
            spot_id: spot.id,
            penalty,
            overstay_minutes: minutes,
            cascade: displacements,
            final_state,
            notifications,
        };

        let Some(outcome) = self.store.resolve_overstay(resolution, now).await? else {
            tracing::warn!(
                booking_id = overstayer.id,
                spot_id = spot.id,
                "Overstay resolution lost a race, will retry",
            );
            return Ok(report);
        };

        tracing::info!(
            booking_id = overstayer.id,
            user_id = overstayer.user_id,
            spot_id = spot.id,
            overstay_minutes = minutes,
            penalty = %penalty,
            added_to_debt = %outcome.charge.to_debt,
            final_state = %final_state,
            "Overstay resolved",
        );

        report.processed_count = 1;
        report.penalties.push(PenaltyRecord {
            booking_id: overstayer.id,
            user_id: overstayer.user_id,
            overstay_minutes: minutes,
            penalty,
            charged_from_balance: outcome.charge.from_balance,
            added_to_debt: outcome.charge.to_debt,
            final_state,
        });
        report.reassignments = reassignments;
        report.cancellations = cancellations;
        Ok(report)
    }

    /// The penalty is already charged but the vehicle is still parked: move
    /// bookings that started behind it since, without charging again.
    async fn displace_still_blocked(
        &self,
        spot: &ParkingSpot,
        bookings: &[Booking],
        overstayer: &Booking,
        planner: &mut ReassignmentPlanner<'_>,
        now: Timestamp,
    ) -> Result<SweepReport, CoreError> {
        let blocked = blocked_bookings(bookings, overstayer, now);
        if blocked.is_empty() {
            return Ok(SweepReport::default());
        }

        let Cascade {
            displacements,
            notifications,
            reassignments,
            cancellations,
        } = self.plan_cascade(spot, blocked, planner);
        let follow_up = FollowUpCascade {
            overstayer_id: overstayer.id,
            spot_id: spot.id,
            cascade: displacements,
            notifications,
        };
        if !self.store.displace_blocked(follow_up, now).await? {
            tracing::warn!(
                booking_id = overstayer.id,
                spot_id = spot.id,
                "Follow-up cascade lost a race, will retry",
            );
            return Ok(SweepReport::default());
        }

        tracing::info!(
            booking_id = overstayer.id,
            spot_id = spot.id,
            reassigned = reassignments.len(),
            cancelled = cancellations.len(),
            "Bookings displaced by resolved overstay",
        );
        Ok(SweepReport {
            reassignments,
            cancellations,
            ..SweepReport::default()
        })
    }

    /// Find a new spot for each blocked booking or cancel it with a refund.
    fn plan_cascade(
        &self,
        spot: &ParkingSpot,
        blocked: Vec<&Booking>,
        planner: &mut ReassignmentPlanner<'_>,
    ) -> Cascade {
        let mut cascade = Cascade::default();
        for booking in blocked {
            match planner.assign(spot, booking) {
                Some(target) => {
                    cascade.displacements.push(Displacement::Reassign {
                        booking_id: booking.id,
                        from_spot_id: spot.id,
                        to_spot_id: target.id,
                    });
                    cascade.notifications.push(reassigned_notice(
                        booking.user_id,
                        booking.id,
                        target,
                        DisplacementCause::PreviousOverstay,
                    ));
                    cascade.reassignments.push(ReassignmentRecord {
                        booking_id: booking.id,
                        user_id: booking.user_id,
                        from_spot_id: spot.id,
                        to_spot_id: target.id,
                        new_spot_number: target.spot_number.clone(),
                    });
                }
                None => {
                    let refund = booking.total_cost;
                    let compensation = self.policy.cancellation_compensation;
                    cascade.displacements.push(Displacement::Cancel {
                        booking_id: booking.id,
                        from_spot_id: spot.id,
                        refund,
                        compensation,
                    });
                    cascade.notifications.push(cancelled_notice(
                        booking.user_id,
                        booking.id,
                        refund,
                        compensation,
                        DisplacementCause::PreviousOverstay,
                    ));
                    cascade.cancellations.push(CancellationRecord {
                        booking_id: booking.id,
                        user_id: booking.user_id,
                        refund_amount: refund,
                        compensation,
                    });
                }
            }
        }
        cascade
    }

    async fn complete_all(
        &self,
        bookings: Vec<&Booking>,
        now: Timestamp,
    ) -> Result<SweepReport, CoreError> {
        let mut report = SweepReport::default();
        for booking in bookings {
            let Some(pending_debt) = self.store.complete_booking(booking.id, now).await? else {
                continue;
            };
            tracing::info!(
                booking_id = booking.id,
                spot_id = booking.spot_id,
                pending_debt = %pending_debt,
                "Booking completed",
            );
            report.completions.push(CompletionRecord {
                booking_id: booking.id,
                user_id: booking.user_id,
                pending_debt,
            });
        }
        Ok(report)
    }
}
