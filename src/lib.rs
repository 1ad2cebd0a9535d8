//! ollama-pull - model-server client library
//!
//! Typed access to a local model server (list, show, streamed pull) and to
//! OpenAI-compatible completion endpoints.
//!
//! # Architecture
//!
//! - **streaming**: byte stream to line framing, NDJSON and SSE decoding
//! - **models**: model-server client, lazy pull stream, error classification
//! - **openai**: completion and chat completion, batch or streamed
//! - **cli**: argument parsing, TOML config, terminal rendering

pub mod errors;
pub mod streaming;
pub mod models;
pub mod openai;
pub mod cli;

// Re-export commonly used types
pub use errors::{ClientError, Result};
pub use models::{
    classify_failure, ClientOptions, ModelApi, ModelInfo, OllamaModelClient, PullProgressLine,
    PullStream,
};
pub use openai::{OpenAiClient, ResponseMode};
