//! Summary stage. Capture fails without a summary, so errors here are fatal
//! and worth retrying upstream.

use {
    crate::{
        error::EngineError,
        llm::{ChatRequest, LlmProvider, complete_with_timeout},
        types::{Enhancement, MemoryRecord},
    },
    std::fmt::Write,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates concise, meaningful \
summaries of personal memories. Keep summaries to 1-2 sentences max. Lead with the most \
distinctive details (names, numbers, places) and preserve the emotional tone.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 100;

/// Produce the one-to-two sentence summary stored alongside the embedding.
pub async fn summarize(
    llm: &dyn LlmProvider,
    record: &MemoryRecord,
    enhancement: &Enhancement,
    timeout_ms: u64,
) -> Result<String, EngineError> {
    let request = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: user_prompt(record, enhancement),
        temperature: TEMPERATURE,
        max_tokens: Some(MAX_TOKENS),
        json_response: false,
    };
    let summary = complete_with_timeout(llm, &request, "summarizer", timeout_ms).await?;
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(EngineError::MalformedResponse {
            stage: "summarizer",
            detail: "empty summary".into(),
        });
    }
    Ok(summary.to_string())
}

fn user_prompt(record: &MemoryRecord, enhancement: &Enhancement) -> String {
    let mut prompt = format!("Summarize this memory:\n\n{}", record.raw_text);
    if enhancement.enhanced_text != record.raw_text {
        let _ = write!(prompt, "\n\nExpanded: {}", enhancement.enhanced_text);
    }
    if let Some(context) = record.context.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(prompt, "\nContext: {context}");
    }
    if let Some(mood) = record.mood.as_deref().filter(|m| !m.is_empty()) {
        let _ = write!(prompt, "\nMood: {mood}");
    }
    if !enhancement.key_entities.is_empty() {
        let _ = write!(prompt, "\nKey entities: {}", enhancement.key_entities.join(", "));
    }
    prompt
}
