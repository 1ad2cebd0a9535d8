//! Streaming body decoders
//!
//! Turns a transport byte stream into decoded records, either one JSON
//! object per line or one per server-sent `data:` event.

pub mod lines;
pub mod ndjson;
pub mod parser;
pub mod sse;

// Re-export commonly used types
pub use lines::{ByteStream, LineStream};
pub use ndjson::NdjsonStream;
pub use parser::{LineParser, MAX_LINE_SIZE};
pub use sse::{SseStream, DONE_MARKER};
