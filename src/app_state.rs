use std::sync::Arc;

use crate::services::generation::GenerationService;
use crate::services::queue::JobQueue;
use crate::services::stores::{FailedStore, ResultStore, SourceRegistry};

/// Shared handles to the engine's collaborating structures.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub failed: Arc<FailedStore>,
    pub results: Arc<ResultStore>,
    pub sources: Arc<SourceRegistry>,
    pub generator: Arc<dyn GenerationService>,
}

impl AppState {
    pub fn new(generator: Arc<dyn GenerationService>) -> Self {
        Self {
            queue: Arc::new(JobQueue::new()),
            failed: Arc::new(FailedStore::new()),
            results: Arc::new(ResultStore::new()),
            sources: Arc::new(SourceRegistry::new()),
            generator,
        }
    }
}
