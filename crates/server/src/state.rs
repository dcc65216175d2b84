use std::sync::Arc;
use vellum_core::{
    ArtifactStorage, Config, ConversionOrchestrator, FileStore, IngestionGate, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn FileStore>,
    storage: Arc<dyn ArtifactStorage>,
    orchestrator: ConversionOrchestrator,
    gate: IngestionGate,
}

impl AppState {
    /// Wire the ingestion gate to the given store, storage and orchestrator.
    pub fn new(
        config: Config,
        store: Arc<dyn FileStore>,
        storage: Arc<dyn ArtifactStorage>,
        orchestrator: ConversionOrchestrator,
    ) -> Self {
        let gate = IngestionGate::new(
            Arc::clone(&store),
            Arc::clone(&storage),
            orchestrator.clone(),
            config.upload.max_file_size_bytes,
        );
        Self {
            config,
            store,
            storage,
            orchestrator,
            gate,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn FileStore {
        self.store.as_ref()
    }

    pub fn storage(&self) -> &dyn ArtifactStorage {
        self.storage.as_ref()
    }

    pub fn orchestrator(&self) -> &ConversionOrchestrator {
        &self.orchestrator
    }

    pub fn gate(&self) -> &IngestionGate {
        &self.gate
    }
}
