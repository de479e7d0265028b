//! Persistence boundary for memory records.

use {
    crate::types::{ContentPatch, MemoryRecord, NewMemory},
    async_trait::async_trait,
    chrono::NaiveDate,
};

/// Result of a conditional processing write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Summary and embedding were written together.
    Applied,
    /// The record's content changed after this run started; nothing was
    /// written.
    Stale,
    /// The record no longer exists.
    Missing,
}

/// Result of a content update.
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    pub record: MemoryRecord,
    /// True when user-authored fields actually changed and the record needs
    /// reprocessing.
    pub reprocess: bool,
}

/// Store of captured memories. Every call is scoped to an owner id and must
/// never return another owner's records.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    // ---- records ----

    /// Insert an unprocessed record and return it with id and timestamp set.
    async fn insert(&self, owner_id: &str, new: NewMemory) -> anyhow::Result<MemoryRecord>;

    async fn get(&self, owner_id: &str, id: &str) -> anyhow::Result<Option<MemoryRecord>>;

    /// Most recent records first, at most `limit`.
    async fn list_recent(&self, owner_id: &str, limit: usize) -> anyhow::Result<Vec<MemoryRecord>>;

    /// Records created on any UTC calendar day in `start..=end`, most recent
    /// first.
    async fn list_between(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<MemoryRecord>>;

    /// Returns true when a record was deleted.
    async fn delete(&self, owner_id: &str, id: &str) -> anyhow::Result<bool>;

    // ---- writes ----

    /// Apply a partial edit. When any user-authored field changes, the stored
    /// summary and embedding are cleared in the same write so the record
    /// never pairs old derived fields with new content.
    async fn update_content(
        &self,
        owner_id: &str,
        id: &str,
        patch: ContentPatch,
    ) -> anyhow::Result<Option<ContentUpdate>>;

    /// Write summary and embedding together, only if the record's current
    /// content still hashes to `expected_fingerprint`.
    async fn apply_processing(
        &self,
        owner_id: &str,
        id: &str,
        summary: &str,
        embedding: &[f32],
        expected_fingerprint: &str,
    ) -> anyhow::Result<ProcessingOutcome>;
}
