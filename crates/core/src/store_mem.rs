//! In-memory reference store. The trait boundary keeps a database-backed
//! implementation possible without touching the pipelines.

use {
    crate::{
        store::{ContentUpdate, MemoryStore, ProcessingOutcome},
        types::{ContentPatch, MemoryRecord, NewMemory},
    },
    async_trait::async_trait,
    chrono::NaiveDate,
    std::collections::HashMap,
    tokio::sync::RwLock,
    uuid::Uuid,
};

/// Process-local store keyed by record id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, MemoryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, keeping its id and timestamps. Used to
    /// load existing data and to stage fixtures in tests.
    pub async fn seed(&self, record: MemoryRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }
}

fn owned_by<'a>(record: Option<&'a MemoryRecord>, owner_id: &str) -> Option<&'a MemoryRecord> {
    record.filter(|r| r.owner_id == owner_id)
}

/// Empty strings clear an optional field, anything else replaces it.
fn apply_optional(slot: &mut Option<String>, value: Option<String>) -> bool {
    match value {
        None => false,
        Some(v) => {
            let next = if v.is_empty() { None } else { Some(v) };
            if *slot == next {
                false
            } else {
                *slot = next;
                true
            }
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn insert(&self, owner_id: &str, new: NewMemory) -> anyhow::Result<MemoryRecord> {
        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            raw_text: new.raw_text,
            summary: None,
            context: new.context,
            mood: new.mood,
            embedding: None,
            created_at: chrono::Utc::now(),
        };
        self.records.write().await.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, owner_id: &str, id: &str) -> anyhow::Result<Option<MemoryRecord>> {
        let records = self.records.read().await;
        Ok(owned_by(records.get(id), owner_id).cloned())
    }

    async fn list_recent(&self, owner_id: &str, limit: usize) -> anyhow::Result<Vec<MemoryRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<MemoryRecord> =
            records.values().filter(|r| r.owner_id == owner_id).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn list_between(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<MemoryRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<MemoryRecord> = records
            .values()
            .filter(|r| {
                let day = r.created_at.date_naive();
                r.owner_id == owner_id && day >= start && day <= end
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        if owned_by(records.get(id), owner_id).is_none() {
            return Ok(false);
        }
        records.remove(id);
        Ok(true)
    }

    async fn update_content(
        &self,
        owner_id: &str,
        id: &str,
        patch: ContentPatch,
    ) -> anyhow::Result<Option<ContentUpdate>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id).filter(|r| r.owner_id == owner_id) else {
            return Ok(None);
        };

        let mut changed = false;
        if let Some(raw_text) = patch.raw_text
            && raw_text != record.raw_text
        {
            record.raw_text = raw_text;
            changed = true;
        }
        changed |= apply_optional(&mut record.context, patch.context);
        changed |= apply_optional(&mut record.mood, patch.mood);

        if changed {
            record.summary = None;
            record.embedding = None;
        }
        Ok(Some(ContentUpdate { record: record.clone(), reprocess: changed }))
    }

    async fn apply_processing(
        &self,
        owner_id: &str,
        id: &str,
        summary: &str,
        embedding: &[f32],
        expected_fingerprint: &str,
    ) -> anyhow::Result<ProcessingOutcome> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id).filter(|r| r.owner_id == owner_id) else {
            return Ok(ProcessingOutcome::Missing);
        };
        if record.fingerprint() != expected_fingerprint {
            return Ok(ProcessingOutcome::Stale);
        }
        record.summary = Some(summary.to_string());
        record.embedding = Some(embedding.to_vec());
        Ok(ProcessingOutcome::Applied)
    }
}
