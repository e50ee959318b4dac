//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::probe::Probe;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds only immutable configuration and the probe runner; every request
/// gets its own connection and its own report.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub probe: Probe,
}

impl AppState {
    /// Creates a new application state from the given configuration and probe.
    pub fn new(config: AppConfig, probe: Probe) -> Self {
        Self {
            config: Arc::new(config),
            probe,
        }
    }
}
