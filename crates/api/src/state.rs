use std::sync::Arc;

use klyra_core::store::ParkingStore;

use crate::config::ServerConfig;
use crate::engine::ParkingEngine;

/// Shared application state handed to every handler via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ParkingStore>,
    pub engine: Arc<ParkingEngine>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the engine over `store` using the configured policy.
    pub fn new(store: Arc<dyn ParkingStore>, config: ServerConfig) -> Self {
        let engine = ParkingEngine::new(store.clone(), config.policy.clone());
        Self {
            store,
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }
}
