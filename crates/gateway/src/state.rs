use std::sync::Arc;

use mnema_core::{
    ingest::{IngestPipeline, IngestQueue},
    recall::RecallEngine,
    store::MemoryStore,
};

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MemoryStore>,
    /// Synchronous capture pipeline, driven by the process endpoint.
    pub pipeline: Arc<IngestPipeline>,
    /// Background capture queue, fed by the create and update endpoints.
    pub queue: Arc<IngestQueue>,
    pub recall: Arc<RecallEngine>,
    /// Bearer token every `/api` request must present.
    pub token: String,
    /// Owner all capture and recall is scoped to.
    pub owner_id: String,
    /// Server version string for /health.
    pub version: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        pipeline: Arc<IngestPipeline>,
        queue: Arc<IngestQueue>,
        recall: Arc<RecallEngine>,
        token: String,
        owner_id: String,
    ) -> Self {
        Self {
            store,
            pipeline,
            queue,
            recall,
            token,
            owner_id,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
