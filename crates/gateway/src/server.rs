use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        extract::State,
        middleware,
        response::IntoResponse,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use {
    mnema_config::MnemaConfig,
    mnema_core::{
        embeddings::EmbeddingProvider,
        embeddings_openai::OpenAiEmbeddingProvider,
        ingest::{IngestPipeline, IngestQueue},
        llm::LlmProvider,
        llm_openai::OpenAiChatProvider,
        recall::RecallEngine,
        store::MemoryStore,
        store_mem::InMemoryStore,
    },
};

use crate::{auth, handlers, state::AppState};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/memories", post(handlers::create_memory).get(handlers::list_memories))
        .route("/memories/process", post(handlers::process_memory))
        .route("/memories/search", post(handlers::search_memories))
        .route(
            "/memories/{id}",
            get(handlers::get_memory)
                .put(handlers::update_memory)
                .delete(handlers::delete_memory),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Resolve secrets, wire the engine and serve until shutdown.
pub async fn start_server(config: MnemaConfig) -> anyhow::Result<()> {
    // Env vars win over the file so secrets never have to live on disk.
    let token = std::env::var("MNEMA_TOKEN")
        .ok()
        .or_else(|| config.gateway.token.clone())
        .ok_or_else(|| anyhow::anyhow!("no gateway token: set MNEMA_TOKEN or gateway.token"))?;

    let llm_key = config
        .llm
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .ok_or_else(|| anyhow::anyhow!("no LLM api key: set OPENAI_API_KEY or llm.api_key"))?;
    let embed_key = config.embedding.api_key.clone().unwrap_or_else(|| llm_key.clone());

    let mut chat = OpenAiChatProvider::new(llm_key).with_model(&config.llm.model);
    if let Some(base) = &config.llm.base_url {
        chat = chat.with_base_url(base);
    }
    let mut embeddings = OpenAiEmbeddingProvider::new(embed_key)
        .with_model(&config.embedding.model, config.embedding.dimensions);
    if let Some(base) = &config.embedding.base_url {
        embeddings = embeddings.with_base_url(base);
    }

    let llm: Arc<dyn LlmProvider> = Arc::new(chat);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embeddings);
    let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());

    let engine = config.engine.clone();
    let pipeline =
        Arc::new(IngestPipeline::new(llm.clone(), embedder.clone(), store.clone(), engine.clone()));
    let queue =
        Arc::new(IngestQueue::start(pipeline.clone(), engine.queue_capacity, engine.workers));
    let recall = Arc::new(RecallEngine::new(llm, embedder, store.clone(), engine));

    let state = AppState::new(
        store,
        pipeline,
        queue,
        recall,
        token,
        config.gateway.owner_id.clone(),
    );
    let app = build_app(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("mnema gateway v{}", state.version),
        format!("listening on {addr}"),
        format!("llm: {}, embeddings: {}", config.llm.model, config.embedding.model),
        format!("owner: {}", config.gateway.owner_id),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "ingest": state.queue.snapshot(),
    }))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        axum::{
            body::Body,
            http::{Request, StatusCode, header},
        },
        mnema_core::{
            config::EngineConfig,
            llm::ChatRequest,
        },
        serde_json::{Value, json},
        tower::ServiceExt,
    };

    /// Scripted backend: canned JSON for the enhancer and temporal parser,
    /// a fixed summary for prose calls.
    struct ScriptedLlm;

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &ChatRequest) -> anyhow::Result<String> {
            if !request.json_response {
                return Ok("New deadlift personal record: 315 pounds for five reps.".into());
            }
            if request.system.starts_with("You are a date parser") {
                Ok(concat!(
                    r#"{"has_temporal": false, "date_range": null, "#,
                    r#""semantic_query": "personal record gym"}"#,
                )
                .into())
            } else {
                Ok(concat!(
                    r#"{"enhanced_text": "A personal best set of deadlifts, heavy and hard won.", "#,
                    r#""key_entities": ["deadlift"], "emotional_tone": "proud"}"#,
                )
                .into())
            }
        }
    }

    /// Embeds gym-flavored text along one axis, everything else along the
    /// other, so similarities in tests are either 1 or 0.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(if text.to_lowercase().contains("gym") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }

        fn model_name(&self) -> &str {
            "keyword"
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn test_app() -> Router {
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(KeywordEmbedder);
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let engine = EngineConfig::default();
        let pipeline = Arc::new(IngestPipeline::new(
            llm.clone(),
            embedder.clone(),
            store.clone(),
            engine.clone(),
        ));
        // No workers; tests drive processing through the process endpoint.
        let queue = Arc::new(IngestQueue::start(pipeline.clone(), 8, 0));
        let recall = Arc::new(RecallEngine::new(llm, embedder, store.clone(), engine));
        build_app(AppState::new(store, pipeline, queue, recall, "tok-1".into(), "local".into()))
    }

    fn request(method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_memory(app: &Router, raw_text: &str) -> String {
        let (status, body) = send(
            app.clone(),
            request(
                "POST",
                "/api/memories",
                Some("tok-1"),
                Some(json!({ "raw_text": raw_text, "context": "", "mood": null })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["memory"]["processed"], json!(false));
        body["memory"]["id"].as_str().unwrap().to_string()
    }

    async fn process_memory(app: &Router, id: &str, raw_text: &str) -> (StatusCode, Value) {
        send(
            app.clone(),
            request(
                "POST",
                "/api/memories/process",
                Some("tok-1"),
                Some(json!({ "memory_id": id, "raw_text": raw_text })),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let (status, body) = send(test_app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
        assert_eq!(body["ingest"]["workers"], json!(0));
    }

    #[tokio::test]
    async fn api_rejects_missing_and_invalid_tokens() {
        let app = test_app();

        let (status, body) = send(
            app.clone(),
            request("POST", "/api/memories/search", None, Some(json!({ "query": "gym" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Unauthorized: Missing Authorization header"));

        let (status, body) = send(
            app,
            request("GET", "/api/memories", Some("wrong-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("Unauthorized: invalid token"));
    }

    #[tokio::test]
    async fn create_list_get_delete_roundtrip() {
        let app = test_app();
        let id = create_memory(&app, "Gym PR on deadlifts! 315x5").await;

        let (status, body) =
            send(app.clone(), request("GET", "/api/memories?limit=10", Some("tok-1"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["memories"][0]["id"], json!(id.clone()));

        let (status, body) = send(
            app.clone(),
            request("GET", &format!("/api/memories/{id}"), Some("tok-1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["memory"]["raw_text"], json!("Gym PR on deadlifts! 315x5"));

        let (status, body) = send(
            app.clone(),
            request("DELETE", &format!("/api/memories/{id}"), Some("tok-1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (status, body) = send(
            app,
            request("GET", &format!("/api/memories/{id}"), Some("tok-1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Memory not found"));
    }

    #[tokio::test]
    async fn blank_raw_text_is_rejected() {
        let (status, body) = send(
            test_app(),
            request("POST", "/api/memories", Some("tok-1"), Some(json!({ "raw_text": "   " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("raw_text is required"));
    }

    #[tokio::test]
    async fn capture_process_search_end_to_end() {
        let app = test_app();
        let id = create_memory(&app, "Gym PR on deadlifts! 315x5").await;

        let (status, body) = process_memory(&app, &id, "Gym PR on deadlifts! 315x5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["memory_id"], json!(id.clone()));
        assert!(body["summary"].as_str().unwrap().contains("315"));
        assert_eq!(body["embedding_dimensions"], json!(2));
        assert_eq!(body["metadata"]["emotional_tone"], json!("proud"));
        assert_eq!(body["metadata"]["key_entities"], json!(["deadlift"]));
        assert!(body["metadata"]["processing_time_ms"].is_u64());

        let (status, body) = send(
            app,
            request(
                "POST",
                "/api/memories/search",
                Some("tok-1"),
                Some(json!({ "query": "personal record gym" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["results"][0]["id"], json!(id));
        assert_eq!(body["results"][0]["match_type"], json!("semantic_only"));
        assert!(body["results"][0]["similarity"].as_f64().unwrap() > 0.3);
        assert_eq!(body["query"]["semantic"], json!("personal record gym"));
        assert!(body["query"].get("date_range").is_none());
    }

    #[tokio::test]
    async fn search_misses_return_an_empty_result_set() {
        let app = test_app();
        let id = create_memory(&app, "Beach day with the kids").await;
        let (status, _) = process_memory(&app, &id, "Beach day with the kids").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app,
            request(
                "POST",
                "/api/memories/search",
                Some("tok-1"),
                Some(json!({ "query": "personal record gym" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(0));
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn blank_search_query_is_a_bad_request() {
        let (status, body) = send(
            test_app(),
            request("POST", "/api/memories/search", Some("tok-1"), Some(json!({ "query": " " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Query is required"));
        assert!(body.get("processing_time_ms").is_none());
    }

    #[tokio::test]
    async fn processing_an_unknown_memory_is_not_found() {
        let (status, body) = process_memory(&test_app(), "no-such-id", "whatever").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Memory not found"));
    }

    #[tokio::test]
    async fn process_requires_both_fields() {
        let (status, body) = send(
            test_app(),
            request(
                "POST",
                "/api/memories/process",
                Some("tok-1"),
                Some(json!({ "memory_id": "m-1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("memory_id and raw_text are required"));
    }

    #[tokio::test]
    async fn editing_a_processed_memory_resets_it() {
        let app = test_app();
        let id = create_memory(&app, "Gym PR on deadlifts! 315x5").await;
        let (status, _) = process_memory(&app, &id, "Gym PR on deadlifts! 315x5").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app.clone(),
            request(
                "PUT",
                &format!("/api/memories/{id}"),
                Some("tok-1"),
                Some(json!({ "raw_text": "Skipped the gym, long walk instead" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["memory"]["processed"], json!(false));
        assert!(body["memory"]["summary"].is_null());

        let (status, body) = send(
            app,
            request(
                "PUT",
                &format!("/api/memories/{id}"),
                Some("tok-1"),
                Some(json!({})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("nothing to update"));
    }
}
