use std::sync::Arc;

use docket_core::{Config, SanitizedConfig, StageOrchestrator, TicketStore};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn TicketStore>,
    orchestrator: StageOrchestrator,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn TicketStore>,
        orchestrator: StageOrchestrator,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Read-side access for listings and views; writes go through the
    /// orchestrator.
    pub fn store(&self) -> &dyn TicketStore {
        self.store.as_ref()
    }

    pub fn orchestrator(&self) -> &StageOrchestrator {
        &self.orchestrator
    }
}
