//! Background monitors.
//!
//! Each submodule provides a long-running loop meant for `tokio::spawn`.
//! Loops stop when their [`CancellationToken`] fires; a tick that outlives
//! the configured timeout is abandoned and retried on the next tick.

pub mod overstay_sweep;
pub mod start_validation;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::engine::ParkingEngine;

/// Owns the spawned monitor tasks.
pub struct Scheduler {
    cancel: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    /// Spawn the overstay sweep and the start-validation loop.
    pub fn start(engine: Arc<ParkingEngine>, config: &MonitorConfig) -> Self {
        let cancel = CancellationToken::new();
        let handles = vec![
            (
                overstay_sweep::TASK_NAME,
                tokio::spawn(overstay_sweep::run(
                    Arc::clone(&engine),
                    config.overstay_sweep_interval,
                    config.tick_timeout,
                    cancel.child_token(),
                )),
            ),
            (
                start_validation::TASK_NAME,
                tokio::spawn(start_validation::run(
                    engine,
                    config.start_validation_interval,
                    config.tick_timeout,
                    cancel.child_token(),
                )),
            ),
        ];
        Self { cancel, handles }
    }

    /// Stop all monitors, waiting at most `grace` for in-flight ticks.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();
        for (name, handle) in self.handles {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => tracing::info!(task = name, "Monitor stopped"),
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "Monitor task failed"),
                Err(_) => tracing::warn!(task = name, "Monitor did not stop in time"),
            }
        }
    }
}
