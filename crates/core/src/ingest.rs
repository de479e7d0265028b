//! Capture orchestration: enhance, summarize, embed, then write summary and
//! embedding in one conditional update. A bounded queue with worker tasks
//! runs the same pipeline in the background for fire-and-forget capture.

use {
    crate::{
        config::EngineConfig,
        embed_text::build_embedding_text,
        embeddings::{EmbeddingProvider, embed_with_timeout},
        enhance::enhance,
        error::EngineError,
        llm::LlmProvider,
        retry::retry_transient,
        store::{MemoryStore, ProcessingOutcome},
        summarize::summarize,
        types::{IngestReport, MemoryRecord},
    },
    serde::Serialize,
    std::{
        sync::{
            Arc,
            atomic::{AtomicU64, AtomicUsize, Ordering},
        },
        time::Instant,
    },
    tokio::sync::{Mutex, mpsc},
    tracing::{debug, error, info, warn},
};

// ── Pipeline ─────────────────────────────────────────────────────────────

/// The capture pipeline with its injected service handles.
pub struct IngestPipeline {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn MemoryStore>,
    config: EngineConfig,
}

/// What a background run did with its job.
#[derive(Debug)]
pub enum IngestOutcome {
    Applied(IngestReport),
    /// Nothing was written; the reason is for logs only.
    Skipped(&'static str),
}

impl IngestPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn MemoryStore>,
        config: EngineConfig,
    ) -> Self {
        Self { llm, embedder, store, config }
    }

    /// Process a memory now and report the derived fields. Used by the
    /// synchronous processing endpoint.
    pub async fn process(
        &self,
        owner_id: &str,
        memory_id: &str,
    ) -> Result<IngestReport, EngineError> {
        let record = self
            .store
            .get(owner_id, memory_id)
            .await
            .map_err(EngineError::Store)?
            .ok_or_else(|| EngineError::NotFound(memory_id.to_string()))?;

        let (report, outcome) = self.execute(&record).await?;
        match outcome {
            ProcessingOutcome::Applied => {
                info!(
                    memory_id,
                    dimensions = report.embedding_dimensions,
                    elapsed_ms = report.elapsed_ms,
                    "memory processed"
                );
            }
            ProcessingOutcome::Stale => {
                warn!(memory_id, "content changed mid-run, keeping the newer edit");
            }
            ProcessingOutcome::Missing => {
                return Err(EngineError::NotFound(memory_id.to_string()));
            }
        }
        Ok(report)
    }

    /// Process a queued job. Skips quietly when the record was deleted or
    /// edited after the job was enqueued; the edit's own job covers it.
    pub async fn run_job(&self, job: &IngestJob) -> Result<IngestOutcome, EngineError> {
        let Some(record) = self
            .store
            .get(&job.owner_id, &job.memory_id)
            .await
            .map_err(EngineError::Store)?
        else {
            return Ok(IngestOutcome::Skipped("record deleted"));
        };
        if record.fingerprint() != job.fingerprint {
            return Ok(IngestOutcome::Skipped("content superseded"));
        }

        let (report, outcome) = self.execute(&record).await?;
        Ok(match outcome {
            ProcessingOutcome::Applied => IngestOutcome::Applied(report),
            ProcessingOutcome::Stale => IngestOutcome::Skipped("content superseded"),
            ProcessingOutcome::Missing => IngestOutcome::Skipped("record deleted"),
        })
    }

    /// Run the stages against a snapshot of the record. The final write is
    /// conditioned on the fingerprint taken here, so an edit that lands
    /// mid-run wins over this run's output.
    async fn execute(
        &self,
        record: &MemoryRecord,
    ) -> Result<(IngestReport, ProcessingOutcome), EngineError> {
        let started = Instant::now();
        let fingerprint = record.fingerprint();

        let enhancement = enhance(
            self.llm.as_ref(),
            &record.raw_text,
            record.context.as_deref(),
            record.mood.as_deref(),
            self.config.chat_timeout_ms,
        )
        .await;

        let summary = retry_transient(&self.config.retry, "summarize", || {
            summarize(self.llm.as_ref(), record, &enhancement, self.config.chat_timeout_ms)
        })
        .await?;

        let embed_input = build_embedding_text(record, &enhancement, &summary);
        let embedding = retry_transient(&self.config.retry, "embed", || {
            embed_with_timeout(self.embedder.as_ref(), &embed_input, self.config.embed_timeout_ms)
        })
        .await?;

        let outcome = self
            .store
            .apply_processing(&record.owner_id, &record.id, &summary, &embedding, &fingerprint)
            .await
            .map_err(EngineError::Store)?;

        let report = IngestReport {
            memory_id: record.id.clone(),
            summary,
            embedding_dimensions: embedding.len(),
            enhancement,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        Ok((report, outcome))
    }
}

// ── Queue ────────────────────────────────────────────────────────────────

/// A unit of background work: one memory, pinned to the content it had when
/// the job was created.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub owner_id: String,
    pub memory_id: String,
    pub fingerprint: String,
}

impl IngestJob {
    pub fn for_record(record: &MemoryRecord) -> Self {
        Self {
            owner_id: record.owner_id.clone(),
            memory_id: record.id.clone(),
            fingerprint: record.fingerprint(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueStats {
    pending: AtomicUsize,
    processed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time queue counters, reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub workers: usize,
}

/// Bounded channel plus worker tasks. Capture requests enqueue and return;
/// when the queue is full the job is dropped with a warning rather than
/// blocking the request.
pub struct IngestQueue {
    tx: mpsc::Sender<IngestJob>,
    stats: Arc<QueueStats>,
    workers: usize,
}

impl IngestQueue {
    pub fn start(pipeline: Arc<IngestPipeline>, capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(QueueStats::default());
        for worker in 0..workers {
            tokio::spawn(run_worker(worker, rx.clone(), pipeline.clone(), stats.clone()));
        }
        info!(workers, capacity, "ingest queue started");
        Self { tx, stats, workers }
    }

    /// Returns false when the queue is full and the job was dropped. The
    /// record stays unprocessed until something re-triggers it.
    pub fn submit(&self, job: IngestJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                self.stats.pending.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(memory_id = %job.memory_id, "ingest queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                error!(memory_id = %job.memory_id, "ingest queue closed, dropping job");
                false
            }
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.stats.pending.load(Ordering::Relaxed),
            processed: self.stats.processed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            workers: self.workers,
        }
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<IngestJob>>>,
    pipeline: Arc<IngestPipeline>,
    stats: Arc<QueueStats>,
) {
    loop {
        let job = { queue.lock().await.recv().await };
        let Some(job) = job else { break };
        stats.pending.fetch_sub(1, Ordering::Relaxed);

        match pipeline.run_job(&job).await {
            Ok(IngestOutcome::Applied(report)) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
                info!(
                    worker,
                    memory_id = %job.memory_id,
                    elapsed_ms = report.elapsed_ms,
                    "memory processed"
                );
            }
            Ok(IngestOutcome::Skipped(reason)) => {
                stats.skipped.fetch_add(1, Ordering::Relaxed);
                debug!(worker, memory_id = %job.memory_id, reason, "job skipped");
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(worker, memory_id = %job.memory_id, error = %e, "processing failed");
            }
        }
    }
    debug!(worker, "ingest worker stopped");
}
