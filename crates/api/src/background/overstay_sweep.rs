//! Periodic overstay sweep over every spot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::engine::ParkingEngine;

pub const TASK_NAME: &str = "overstay_sweep";

/// Run the sweep loop until `cancel` fires.
pub async fn run(
    engine: Arc<ParkingEngine>,
    every: Duration,
    tick_timeout: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Overstay monitor started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Overstay monitor stopping");
                break;
            }
            _ = interval.tick() => {
                tick(&engine, tick_timeout).await;
            }
        }
    }
}

/// One bounded sweep. Failures are logged; the next tick retries.
pub async fn tick(engine: &ParkingEngine, tick_timeout: Duration) {
    match tokio::time::timeout(tick_timeout, engine.run_overstay_sweep(Utc::now())).await {
        Ok(Ok(report)) => {
            if report.is_empty() {
                tracing::debug!("Overstay sweep: nothing to do");
            }
        }
        Ok(Err(e)) if e.is_transient() => {
            tracing::warn!(error = %e, "Overstay sweep: store unavailable, will retry");
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Overstay sweep failed");
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = tick_timeout.as_secs(),
                "Overstay sweep timed out",
            );
        }
    }
}
