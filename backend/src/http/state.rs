//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::SamplingSettings;
use crate::models::Facility;
use crate::monitoring::{MonitoringSession, ProbeSimulator};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Monitored facility
    pub facility: Arc<Facility>,
    /// Monitoring session fed by the probe simulator
    pub session: MonitoringSession,
    /// Settings of the probe simulators created on start
    pub sampling: Arc<SamplingSettings>,
}

impl AppState {
    pub fn new(facility: Arc<Facility>, session: MonitoringSession, sampling: SamplingSettings) -> Self {
        Self {
            facility,
            session,
            sampling: Arc::new(sampling),
        }
    }

    /// Fresh probe simulator over the monitored facility.
    pub fn probes(&self) -> ProbeSimulator {
        ProbeSimulator::new(Arc::clone(&self.facility), &self.sampling)
    }
}
