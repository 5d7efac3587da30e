//! Application state.

use bugle_core::Config;

use crate::registry::Registry;

/// State shared across WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            config,
        }
    }
}
