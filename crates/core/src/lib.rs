//! Memory engine: the capture pipeline (enhance, summarize, embed, atomic
//! update) and hybrid recall (temporal parse, embed, retrieve, rank).

pub mod config;
pub mod embed_text;
pub mod embeddings;
pub mod embeddings_openai;
pub mod enhance;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod llm_openai;
pub mod rank;
pub mod recall;
pub mod retrieve;
pub mod retry;
pub mod store;
pub mod store_mem;
pub mod summarize;
pub mod temporal;
pub mod types;
