//! HTTP handlers.

pub mod stats;

use std::time::Instant;

use crate::chat::BroadcastCoordinator;

pub use stats::{health_check, stats, HealthResponse, StatsResponse};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Chat coordinator.
    pub coordinator: BroadcastCoordinator,
    /// When the process started serving.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(coordinator: BroadcastCoordinator) -> Self {
        Self {
            coordinator,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
