//! OpenAI-compatible completion client
//!
//! Batch and streamed text/chat completions with bearer-token auth.

pub mod client;
pub mod mode;
pub mod stream;
pub mod types;

pub use client::{OpenAiClient, DEFAULT_OPENAI_URL};
pub use mode::{ResponseMode, StreamFlag};
pub use stream::CompletionStream;
pub use types::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatDelta, ChatMessage,
    CompletionChoice, CompletionRequest, CompletionResponse, Role, Usage,
};
