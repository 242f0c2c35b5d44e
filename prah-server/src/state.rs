//! Application state management

use crate::config::AllowedOrigins;
use prah_core::SessionSource;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Provider of schedules and sessions
    pub source: Arc<dyn SessionSource>,

    /// Origins the CORS layer admits
    pub allowed_origins: AllowedOrigins,
}

impl AppState {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        Self {
            source,
            allowed_origins: AllowedOrigins::default(),
        }
    }

    pub fn with_allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.allowed_origins = origins;
        self
    }
}
