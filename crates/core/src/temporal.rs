//! Temporal query parsing: turns "last Monday gym" into a date range plus a
//! semantic residue. Failures fall back to treating the query as purely
//! semantic, never to failing the search.

use {
    crate::{
        error::EngineError,
        llm::{ChatRequest, LlmProvider, complete_with_timeout},
        types::{DateRange, QueryAnalysis},
    },
    chrono::NaiveDate,
    serde::Deserialize,
    tracing::{debug, warn},
};

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 200;

/// Read the temporal part of a recall query, evaluated against `today`.
pub async fn parse_temporal_query(
    llm: &dyn LlmProvider,
    query: &str,
    today: NaiveDate,
    timeout_ms: u64,
) -> QueryAnalysis {
    match try_parse(llm, query, today, timeout_ms).await {
        Ok(analysis) => analysis,
        Err(error) => {
            warn!(error = %error, "temporal parsing failed, treating query as semantic");
            QueryAnalysis::without_temporal(query)
        }
    }
}

async fn try_parse(
    llm: &dyn LlmProvider,
    query: &str,
    today: NaiveDate,
    timeout_ms: u64,
) -> Result<QueryAnalysis, EngineError> {
    let request = ChatRequest {
        system: system_prompt(),
        user: format!(
            "Current date: {today} ({weekday}). Parse this query: \"{query}\"",
            weekday = today.format("%A"),
        ),
        temperature: TEMPERATURE,
        max_tokens: Some(MAX_TOKENS),
        json_response: true,
    };
    let reply = complete_with_timeout(llm, &request, "temporal parser", timeout_ms).await?;

    let parsed: ParsedReply = serde_json::from_str(&reply).map_err(|e| {
        EngineError::MalformedResponse { stage: "temporal parser", detail: e.to_string() }
    })?;

    let semantic_query = parsed.semantic_query.unwrap_or_default().trim().to_string();

    let date_range = match (parsed.has_temporal, parsed.date_range) {
        (true, Some(range)) => {
            if range.start > range.end {
                return Err(EngineError::MalformedResponse {
                    stage: "temporal parser",
                    detail: format!("range start {} after end {}", range.start, range.end),
                });
            }
            Some(range)
        }
        (true, None) => {
            debug!(query, "temporal flag without a date range, treating as semantic");
            None
        }
        (false, _) => None,
    };

    if date_range.is_some() {
        // A purely temporal query legitimately leaves the residue empty.
        Ok(QueryAnalysis {
            original_query: query.to_string(),
            semantic_query,
            has_temporal: true,
            date_range,
        })
    } else if semantic_query.is_empty() {
        Ok(QueryAnalysis::without_temporal(query))
    } else {
        Ok(QueryAnalysis {
            original_query: query.to_string(),
            semantic_query,
            has_temporal: false,
            date_range: None,
        })
    }
}

fn system_prompt() -> String {
    "You are a date parser. Extract date ranges from natural language queries about \
personal memories.\n\n\
IMPORTANT RULES:\n\
- \"last Monday\" means the most recent Monday BEFORE today (not this coming Monday)\n\
- \"yesterday\" means exactly 1 day ago\n\
- \"last week\" means 7 days ago to yesterday\n\
- \"last month\" means the entire previous calendar month\n\
- Always calculate dates accurately from the current date\n\n\
Examples:\n\
Input: \"last Monday\" (today is Friday, Feb 7, 2026)\n\
Output: {\"has_temporal\": true, \"date_range\": {\"start\": \"2026-02-03\", \"end\": \"2026-02-03\"}, \"semantic_query\": \"\"}\n\n\
Input: \"last Monday gym\" (today is Friday, Feb 7, 2026)\n\
Output: {\"has_temporal\": true, \"date_range\": {\"start\": \"2026-02-03\", \"end\": \"2026-02-03\"}, \"semantic_query\": \"gym workout exercise\"}\n\n\
Input: \"conversation with Sarah\"\n\
Output: {\"has_temporal\": false, \"date_range\": null, \"semantic_query\": \"conversation with Sarah\"}\n\n\
Respond with JSON: {\"has_temporal\": boolean, \"date_range\": {\"start\": \"YYYY-MM-DD\", \
\"end\": \"YYYY-MM-DD\"} or null, \"semantic_query\": string}"
        .to_string()
}

#[derive(Deserialize)]
struct ParsedReply {
    #[serde(default)]
    has_temporal: bool,
    #[serde(default)]
    date_range: Option<DateRange>,
    #[serde(default)]
    semantic_query: Option<String>,
}
