//! Shared application state for the HTTP handlers.

use std::{sync::Arc, time::Instant};

use surety_core::{store::RecordStore, time::Clock};
use surety_inspection::InspectionClient;

use crate::config::Config;

/// Collaborators injected into every handler through the router.
///
/// Everything is behind an `Arc`, so cloning per request is cheap. Building
/// the state is the only place implementations are chosen; handlers only see
/// the traits.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for all workflow entities.
    pub store: Arc<dyn RecordStore>,
    /// Client for the inspection provider.
    pub inspector: Arc<InspectionClient>,
    /// Time source for timestamps and token expiries.
    pub clock: Arc<dyn Clock>,
    /// Service configuration.
    pub config: Arc<Config>,
    /// When this state was built; drives the health endpoint's uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Creates the application state from its collaborators.
    pub fn new(
        store: Arc<dyn RecordStore>,
        inspector: Arc<InspectionClient>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
    ) -> Self {
        let started_at = clock.now();
        Self { store, inspector, clock, config, started_at }
    }
}
