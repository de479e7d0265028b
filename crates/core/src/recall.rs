//! Recall orchestration: parse the query, embed it, fetch candidates and
//! rank them. Stages run sequentially; only embedding and retrieval can
//! fail the request.

use {
    crate::{
        config::EngineConfig,
        embeddings::{EmbeddingProvider, embed_with_timeout},
        error::EngineError,
        llm::LlmProvider,
        rank::rank_candidates,
        retrieve::fetch_candidates,
        store::MemoryStore,
        temporal::parse_temporal_query,
        types::{QueryAnalysis, SearchResult},
    },
    chrono::NaiveDate,
    std::{sync::Arc, time::Instant},
    tracing::{debug, info},
};

/// A completed search with its query analysis and timing.
#[derive(Debug)]
pub struct RecallOutcome {
    pub analysis: QueryAnalysis,
    pub results: Vec<SearchResult>,
    pub elapsed_ms: u64,
}

/// The recall pipeline with its injected service handles.
pub struct RecallEngine {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn MemoryStore>,
    config: EngineConfig,
}

impl RecallEngine {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn MemoryStore>,
        config: EngineConfig,
    ) -> Self {
        Self { llm, embedder, store, config }
    }

    /// Search with relative dates evaluated against the current UTC day.
    pub async fn search(
        &self,
        owner_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<RecallOutcome, EngineError> {
        self.search_at(owner_id, query, limit, chrono::Utc::now().date_naive()).await
    }

    /// Search with relative dates evaluated against a fixed day. Backfills
    /// and tests use this to keep "yesterday" stable.
    pub async fn search_at(
        &self,
        owner_id: &str,
        query: &str,
        limit: Option<usize>,
        today: NaiveDate,
    ) -> Result<RecallOutcome, EngineError> {
        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::Validation("Query is required".into()));
        }
        let top_k = limit.unwrap_or(self.config.default_limit);

        let analysis =
            parse_temporal_query(self.llm.as_ref(), query, today, self.config.chat_timeout_ms)
                .await;

        // A purely temporal query has no residue; embed the original text.
        let embed_input = if analysis.semantic_query.is_empty() {
            &analysis.original_query
        } else {
            &analysis.semantic_query
        };
        let query_vector =
            embed_with_timeout(self.embedder.as_ref(), embed_input, self.config.embed_timeout_ms)
                .await?;

        let candidates = fetch_candidates(
            self.store.as_ref(),
            owner_id,
            analysis.date_range.as_ref(),
            self.config.date_slack_days,
            self.config.recency_window,
        )
        .await?;
        debug!(candidates = candidates.len(), "scoring candidates");

        let results = rank_candidates(
            &query_vector,
            candidates,
            self.config.similarity_threshold,
            top_k,
            analysis.date_range.is_some(),
        );

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(owner_id, query, results = results.len(), elapsed_ms, "recall complete");
        Ok(RecallOutcome { analysis, results, elapsed_ms })
    }
}
