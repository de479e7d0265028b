//! Enhancement stage: expands a terse note into richer text and pulls out
//! entities and tone. Failure here degrades the memory, never the capture.

use {
    crate::{
        error::EngineError,
        llm::{ChatRequest, LlmProvider, complete_with_timeout},
        types::Enhancement,
    },
    serde::Deserialize,
    std::fmt::Write,
    tracing::warn,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that enriches personal memory notes. \
Expand the note into 2-4 sentences that spell out what it implies, without inventing details \
the text does not suggest. Identify the key entities (people, places, activities, objects) \
and the overall emotional tone. Respond with JSON: \
{\"enhanced_text\": string, \"key_entities\": [string], \"emotional_tone\": string}";

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 300;

/// Run the enhancement stage. On any failure the raw text is kept, entities
/// stay empty and the tone falls back to the stated mood (or "neutral").
pub async fn enhance(
    llm: &dyn LlmProvider,
    raw_text: &str,
    context: Option<&str>,
    mood: Option<&str>,
    timeout_ms: u64,
) -> Enhancement {
    match try_enhance(llm, raw_text, context, mood, timeout_ms).await {
        Ok(enhancement) => enhancement,
        Err(error) => {
            warn!(error = %error, "enhancement degraded, keeping raw text");
            Enhancement {
                enhanced_text: raw_text.to_string(),
                key_entities: Vec::new(),
                emotional_tone: fallback_tone(mood),
                degraded: true,
            }
        }
    }
}

async fn try_enhance(
    llm: &dyn LlmProvider,
    raw_text: &str,
    context: Option<&str>,
    mood: Option<&str>,
    timeout_ms: u64,
) -> Result<Enhancement, EngineError> {
    let request = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: user_prompt(raw_text, context, mood),
        temperature: TEMPERATURE,
        max_tokens: Some(MAX_TOKENS),
        json_response: true,
    };
    let reply = complete_with_timeout(llm, &request, "enhancer", timeout_ms).await?;

    let parsed: EnhancerReply = serde_json::from_str(&reply).map_err(|e| {
        EngineError::MalformedResponse { stage: "enhancer", detail: e.to_string() }
    })?;

    let enhanced_text = parsed.enhanced_text.trim().to_string();
    if enhanced_text.is_empty() {
        return Err(EngineError::MalformedResponse {
            stage: "enhancer",
            detail: "empty enhanced_text".into(),
        });
    }

    let mut key_entities: Vec<String> = Vec::new();
    for entity in parsed.key_entities {
        let entity = entity.trim();
        if !entity.is_empty() && !key_entities.iter().any(|e| e == entity) {
            key_entities.push(entity.to_string());
        }
    }

    let emotional_tone = match parsed.emotional_tone {
        Some(tone) if !tone.trim().is_empty() => tone.trim().to_string(),
        _ => fallback_tone(mood),
    };

    Ok(Enhancement { enhanced_text, key_entities, emotional_tone, degraded: false })
}

fn user_prompt(raw_text: &str, context: Option<&str>, mood: Option<&str>) -> String {
    let mut prompt = format!("Memory: {raw_text}");
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        let _ = write!(prompt, "\nContext: {context}");
    }
    if let Some(mood) = mood.filter(|m| !m.is_empty()) {
        let _ = write!(prompt, "\nMood: {mood}");
    }
    prompt
}

fn fallback_tone(mood: Option<&str>) -> String {
    mood.filter(|m| !m.is_empty()).unwrap_or("neutral").to_string()
}

#[derive(Deserialize)]
struct EnhancerReply {
    enhanced_text: String,
    #[serde(default)]
    key_entities: Vec<String>,
    #[serde(default)]
    emotional_tone: Option<String>,
}

#[cfg(test)]
mod tests {
    use {super::*, async_trait::async_trait};

    struct CannedLlm {
        reply: anyhow::Result<String>,
    }

    impl CannedLlm {
        fn ok(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()) }
        }

        fn failing(message: &str) -> Self {
            Self { reply: Err(anyhow::anyhow!("{message}")) }
        }
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &ChatRequest) -> anyhow::Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    #[tokio::test]
    async fn well_formed_reply_is_parsed() {
        let llm = CannedLlm::ok(
            r#"{"enhanced_text": "Spent the evening bouldering with Sam.",
                "key_entities": ["bouldering", "Sam"],
                "emotional_tone": "energized"}"#,
        );
        let result = enhance(&llm, "bouldering w/ sam", None, None, 1000).await;
        assert!(!result.degraded);
        assert_eq!(result.enhanced_text, "Spent the evening bouldering with Sam.");
        assert_eq!(result.key_entities, vec!["bouldering", "Sam"]);
        assert_eq!(result.emotional_tone, "energized");
    }

    #[tokio::test]
    async fn entities_are_deduplicated_and_trimmed() {
        let llm = CannedLlm::ok(
            r#"{"enhanced_text": "Coffee with Mara downtown.",
                "key_entities": [" Mara ", "coffee", "Mara", ""],
                "emotional_tone": "warm"}"#,
        );
        let result = enhance(&llm, "coffee w/ mara", None, None, 1000).await;
        assert_eq!(result.key_entities, vec!["Mara", "coffee"]);
    }

    #[tokio::test]
    async fn non_json_reply_degrades_to_raw_text() {
        let llm = CannedLlm::ok("Sure! Here is an expanded version: ...");
        let result = enhance(&llm, "raw note", None, Some("tired"), 1000).await;
        assert!(result.degraded);
        assert_eq!(result.enhanced_text, "raw note");
        assert!(result.key_entities.is_empty());
        assert_eq!(result.emotional_tone, "tired");
    }

    #[tokio::test]
    async fn provider_failure_degrades_with_neutral_tone() {
        let llm = CannedLlm::failing("HTTP 500 - upstream exploded");
        let result = enhance(&llm, "raw note", None, None, 1000).await;
        assert!(result.degraded);
        assert_eq!(result.enhanced_text, "raw note");
        assert_eq!(result.emotional_tone, "neutral");
    }

    #[tokio::test]
    async fn blank_enhanced_text_counts_as_malformed() {
        let llm = CannedLlm::ok(r#"{"enhanced_text": "   ", "key_entities": []}"#);
        let result = enhance(&llm, "raw note", None, None, 1000).await;
        assert!(result.degraded);
        assert_eq!(result.enhanced_text, "raw note");
    }
}
