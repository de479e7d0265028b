//! Gateway: HTTP surface over the capture and recall engine.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Resolve the bearer token and provider keys
//! 3. Wire the store, capture pipeline, queue and recall engine
//! 4. Serve the `/api` routes behind auth, `/health` in the open
//!
//! All engine logic lives in `mnema-core`; handlers translate HTTP requests
//! into engine calls and engine errors into the response envelope.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
