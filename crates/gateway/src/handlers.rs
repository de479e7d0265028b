//! HTTP handlers for the memory API.
//!
//! Every response uses the `{"success": ..., ...}` envelope; failures carry
//! `{"success": false, "error": ...}` with the matching status code.

use std::time::Instant;

use {
    axum::{
        Json,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::json,
    tracing::{error, info},
};

use mnema_core::{
    ingest::IngestJob,
    types::{ContentPatch, DateRange, MAX_RAW_TEXT_LEN, MemoryRecord, NewMemory, SearchResult},
};

use crate::{error::ApiError, state::AppState};

/// Records returned by the list endpoint when no limit is given.
const DEFAULT_LIST_LIMIT: usize = 100;

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

/// Partial edit; omitted fields are left as they are.
#[derive(Debug, Deserialize)]
pub struct UpdateMemoryRequest {
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub memory_id: String,
    #[serde(default)]
    pub raw_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

// ── Response bodies ──────────────────────────────────────────────────────────

/// Record view for API responses. The embedding vector stays internal;
/// `processed` tells the client whether capture has completed.
#[derive(Debug, Serialize)]
pub struct MemoryView {
    pub id: String,
    pub raw_text: String,
    pub summary: Option<String>,
    pub context: Option<String>,
    pub mood: Option<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MemoryRecord> for MemoryView {
    fn from(record: MemoryRecord) -> Self {
        Self {
            processed: record.is_processed(),
            id: record.id,
            raw_text: record.raw_text,
            summary: record.summary,
            context: record.context,
            mood: record.mood,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub memory_id: String,
    pub summary: String,
    pub embedding_dimensions: usize,
    pub metadata: ProcessMetadata,
}

#[derive(Debug, Serialize)]
pub struct ProcessMetadata {
    pub enhanced_text_preview: String,
    pub key_entities: Vec<String>,
    pub emotional_tone: String,
    pub processing_time_ms: u64,
}

/// Echo of how the query was understood.
#[derive(Debug, Serialize)]
pub struct QueryEcho {
    pub original: String,
    pub semantic: String,
    pub has_temporal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: QueryEcho,
    pub results: Vec<SearchResult>,
    pub count: usize,
    pub processing_time_ms: u64,
}

// ── Validation helpers ───────────────────────────────────────────────────────

fn validate_raw_text(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("raw_text is required".into()));
    }
    if trimmed.chars().count() > MAX_RAW_TEXT_LEN {
        return Err(ApiError::BadRequest(format!(
            "raw_text must be at most {MAX_RAW_TEXT_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field on create; blank collapses to absent.
fn clean_optional(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Trim a patch field. An explicit empty string survives; the store reads it
/// as "clear this field".
fn trim_patch_field(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string())
}

fn store_error(e: anyhow::Error) -> ApiError {
    ApiError::Internal(format!("{e:#}"))
}

// ── CRUD handlers ────────────────────────────────────────────────────────────

/// `POST /api/memories`. Captures a new memory and returns the unprocessed
/// record immediately; enhancement, summary and embedding land in the
/// background.
pub async fn create_memory(
    State(state): State<AppState>,
    Json(body): Json<CreateMemoryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let new = NewMemory {
        raw_text: validate_raw_text(&body.raw_text)?,
        context: clean_optional(body.context),
        mood: clean_optional(body.mood),
    };
    let record = state.store.insert(&state.owner_id, new).await.map_err(store_error)?;
    info!(memory_id = %record.id, "memory captured");
    state.queue.submit(IngestJob::for_record(&record));
    Ok(Json(json!({ "success": true, "memory": MemoryView::from(record) })))
}

/// `GET /api/memories?limit=`. The owner's records, most recent first.
pub async fn list_memories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let records =
        state.store.list_recent(&state.owner_id, limit).await.map_err(store_error)?;
    let memories: Vec<MemoryView> = records.into_iter().map(MemoryView::from).collect();
    Ok(Json(json!({ "success": true, "count": memories.len(), "memories": memories })))
}

/// `GET /api/memories/{id}`
pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state
        .store
        .get(&state.owner_id, &id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| ApiError::NotFound("Memory not found".into()))?;
    Ok(Json(json!({ "success": true, "memory": MemoryView::from(record) })))
}

/// `PUT /api/memories/{id}`. Partial edit: a change to any user-authored
/// field clears the stored summary and embedding in the same write and
/// enqueues reprocessing.
pub async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateMemoryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.raw_text.is_none() && body.context.is_none() && body.mood.is_none() {
        return Err(ApiError::BadRequest("nothing to update".into()));
    }
    let patch = ContentPatch {
        raw_text: match body.raw_text {
            Some(raw) => Some(validate_raw_text(&raw)?),
            None => None,
        },
        context: trim_patch_field(body.context),
        mood: trim_patch_field(body.mood),
    };
    let update = state
        .store
        .update_content(&state.owner_id, &id, patch)
        .await
        .map_err(store_error)?
        .ok_or_else(|| ApiError::NotFound("Memory not found".into()))?;
    if update.reprocess {
        info!(memory_id = %id, "content changed, reprocessing");
        state.queue.submit(IngestJob::for_record(&update.record));
    }
    Ok(Json(json!({ "success": true, "memory": MemoryView::from(update.record) })))
}

/// `DELETE /api/memories/{id}`
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.store.delete(&state.owner_id, &id).await.map_err(store_error)?;
    if !deleted {
        return Err(ApiError::NotFound("Memory not found".into()));
    }
    info!(memory_id = %id, "memory deleted");
    Ok(Json(json!({ "success": true })))
}

// ── Pipeline handlers ────────────────────────────────────────────────────────

/// `POST /api/memories/process`. Runs the capture pipeline on a stored
/// record now and reports the derived fields. The pipeline always reads the
/// record's current content; the `raw_text` in the body is only checked for
/// presence.
pub async fn process_memory(
    State(state): State<AppState>,
    Json(body): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    if body.memory_id.trim().is_empty() || body.raw_text.trim().is_empty() {
        return Err(ApiError::BadRequest("memory_id and raw_text are required".into()));
    }
    let report = state.pipeline.process(&state.owner_id, &body.memory_id).await?;
    let preview: String = report.enhancement.enhanced_text.chars().take(120).collect();
    Ok(Json(ProcessResponse {
        success: true,
        memory_id: report.memory_id,
        summary: report.summary,
        embedding_dimensions: report.embedding_dimensions,
        metadata: ProcessMetadata {
            enhanced_text_preview: preview,
            key_entities: report.enhancement.key_entities,
            emotional_tone: report.enhancement.emotional_tone,
            processing_time_ms: report.elapsed_ms,
        },
    }))
}

/// `POST /api/memories/search`. Hybrid recall; server failures carry
/// `processing_time_ms` so clients can report how long the attempt took.
pub async fn search_memories(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Response {
    let started = Instant::now();
    match state.recall.search(&state.owner_id, &body.query, body.limit).await {
        Ok(outcome) => {
            let count = outcome.results.len();
            Json(SearchResponse {
                success: true,
                query: QueryEcho {
                    original: outcome.analysis.original_query,
                    semantic: outcome.analysis.semantic_query,
                    has_temporal: outcome.analysis.has_temporal,
                    date_range: outcome.analysis.date_range,
                },
                results: outcome.results,
                count,
                processing_time_ms: outcome.elapsed_ms,
            })
            .into_response()
        }
        Err(e) => {
            let api = ApiError::from(e);
            if api.status() != StatusCode::INTERNAL_SERVER_ERROR {
                return api.into_response();
            }
            let elapsed_ms = started.elapsed().as_millis() as u64;
            error!(error = %api, elapsed_ms, "search failed");
            (
                api.status(),
                Json(json!({
                    "success": false,
                    "error": api.to_string(),
                    "processing_time_ms": elapsed_ms,
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_is_trimmed_and_bounded() {
        assert_eq!(validate_raw_text("  hello  ").unwrap(), "hello");
        assert!(validate_raw_text("   ").is_err());
        assert!(validate_raw_text(&"x".repeat(MAX_RAW_TEXT_LEN)).is_ok());
        assert!(validate_raw_text(&"x".repeat(MAX_RAW_TEXT_LEN + 1)).is_err());
    }

    #[test]
    fn blank_optional_fields_collapse_to_absent_on_create() {
        assert_eq!(clean_optional(Some("  gym  ".into())), Some("gym".into()));
        assert_eq!(clean_optional(Some("   ".into())), None);
        assert_eq!(clean_optional(None), None);
    }

    #[test]
    fn patch_fields_keep_explicit_empty_strings() {
        assert_eq!(trim_patch_field(Some("  ".into())), Some(String::new()));
        assert_eq!(trim_patch_field(Some(" calm ".into())), Some("calm".into()));
        assert_eq!(trim_patch_field(None), None);
    }

    #[test]
    fn memory_view_never_exposes_the_embedding() {
        let record = MemoryRecord {
            id: "m-1".into(),
            owner_id: "alice".into(),
            raw_text: "note".into(),
            summary: Some("a note".into()),
            context: None,
            mood: None,
            embedding: Some(vec![0.1, 0.2]),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(MemoryView::from(record)).unwrap();
        assert!(value.get("embedding").is_none());
        assert_eq!(value["processed"], serde_json::json!(true));
    }

    #[test]
    fn request_bodies_default_missing_fields() {
        let process: ProcessRequest = serde_json::from_str("{}").unwrap();
        assert!(process.memory_id.is_empty());
        assert!(process.raw_text.is_empty());

        let search: SearchRequest = serde_json::from_str(r#"{"query": "gym"}"#).unwrap();
        assert_eq!(search.query, "gym");
        assert!(search.limit.is_none());
    }

    #[test]
    fn absent_date_range_is_omitted_from_the_query_echo() {
        let echo = QueryEcho {
            original: "gym".into(),
            semantic: "gym".into(),
            has_temporal: false,
            date_range: None,
        };
        let value = serde_json::to_value(echo).unwrap();
        assert!(value.get("date_range").is_none());
    }
}
