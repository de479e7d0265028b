//! Shared data model for captured memories and recall results.

use {
    chrono::{DateTime, NaiveDate, Utc},
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

/// Longest raw text accepted for a single memory.
pub const MAX_RAW_TEXT_LEN: usize = 5000;

/// A captured memory with optional derived fields.
///
/// `summary` and `embedding` are produced together by the capture pipeline:
/// either both are present (processed) or both are absent. No write path may
/// set one without the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub owner_id: String,
    pub raw_text: String,
    pub summary: Option<String>,
    pub context: Option<String>,
    pub mood: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Whether the capture pipeline has completed for this record.
    pub fn is_processed(&self) -> bool {
        self.embedding.is_some()
    }

    /// Fingerprint of the user-authored content, used to detect edits that
    /// land while a processing run is in flight.
    pub fn fingerprint(&self) -> String {
        content_fingerprint(&self.raw_text, self.context.as_deref(), self.mood.as_deref())
    }
}

/// Hash of the editable fields of a memory. A unit separator keeps adjacent
/// fields from colliding ("ab" + "" vs "a" + "b").
pub fn content_fingerprint(raw_text: &str, context: Option<&str>, mood: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_text.as_bytes());
    hasher.update([0x1f]);
    hasher.update(context.unwrap_or_default().as_bytes());
    hasher.update([0x1f]);
    hasher.update(mood.unwrap_or_default().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// User-authored fields for a new memory.
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub raw_text: String,
    pub context: Option<String>,
    pub mood: Option<String>,
}

/// Partial update of the user-authored fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub raw_text: Option<String>,
    pub context: Option<String>,
    pub mood: Option<String>,
}

/// Output of the enhancement stage.
#[derive(Debug, Clone)]
pub struct Enhancement {
    /// Expanded version of the raw text. Equal to the raw text when the
    /// stage degraded.
    pub enhanced_text: String,
    pub key_entities: Vec<String>,
    pub emotional_tone: String,
    /// True when enhancement failed and placeholder values are in use.
    pub degraded: bool,
}

/// Inclusive calendar-day range extracted from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Structured reading of a recall query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    /// Query text with temporal phrasing stripped. May be empty when the
    /// query was purely temporal ("what happened yesterday").
    pub semantic_query: String,
    pub has_temporal: bool,
    pub date_range: Option<DateRange>,
}

impl QueryAnalysis {
    /// Analysis that treats the whole query as semantic. Used when temporal
    /// parsing fails or finds nothing.
    pub fn without_temporal(query: &str) -> Self {
        Self {
            original_query: query.to_string(),
            semantic_query: query.to_string(),
            has_temporal: false,
            date_range: None,
        }
    }
}

/// How a recall result was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Candidate set was date-filtered before similarity ranking.
    TemporalSemantic,
    /// Pure similarity over recent memories.
    SemanticOnly,
}

/// One ranked recall hit. The embedding vector itself is never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub raw_text: String,
    pub summary: Option<String>,
    pub context: Option<String>,
    pub mood: Option<String>,
    pub created_at: DateTime<Utc>,
    pub similarity: f32,
    pub match_type: MatchType,
}

/// Outcome of a completed capture run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub memory_id: String,
    pub summary: String,
    pub embedding_dimensions: usize,
    pub enhancement: Enhancement,
    pub elapsed_ms: u64,
}
