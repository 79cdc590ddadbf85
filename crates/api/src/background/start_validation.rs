//! Periodic start checks for bookings about to begin.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::engine::{ParkingEngine, StartAction};

pub const TASK_NAME: &str = "start_validation";

/// Run the start-validation loop until `cancel` fires.
pub async fn run(
    engine: Arc<ParkingEngine>,
    every: Duration,
    tick_timeout: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Start-validation monitor started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Start-validation monitor stopping");
                break;
            }
            _ = interval.tick() => {
                tick(&engine, tick_timeout).await;
            }
        }
    }
}

pub async fn tick(engine: &ParkingEngine, tick_timeout: Duration) {
    match tokio::time::timeout(tick_timeout, engine.validate_upcoming_starts(Utc::now())).await {
        Ok(Ok(results)) => {
            let displaced = results
                .iter()
                .filter(|r| r.action != StartAction::None)
                .count();
            if !results.is_empty() {
                tracing::debug!(checked = results.len(), displaced, "Start validation pass");
            }
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Start validation failed");
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = tick_timeout.as_secs(),
                "Start validation timed out",
            );
        }
    }
}
