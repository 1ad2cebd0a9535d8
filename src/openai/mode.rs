//! Response mode negotiation
//!
//! The `stream` flag in a request body has to agree with how the response
//! is consumed. Calls pick a [`ResponseMode`] and apply it to the request
//! right before it is serialized.

use crate::openai::types::{ChatCompletionRequest, CompletionRequest};

/// How a response body is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One JSON document
    Batch,
    /// Server-sent events
    Streaming,
}

/// Requests carrying a `stream` flag
pub trait StreamFlag {
    fn stream_flag(&self) -> Option<bool>;
    fn set_stream_flag(&mut self, stream: Option<bool>);
}

impl ResponseMode {
    /// Value of the `Accept` header for this mode
    pub fn accept(self) -> &'static str {
        match self {
            ResponseMode::Batch => "application/json",
            ResponseMode::Streaming => "text/event-stream",
        }
    }

    /// Normalize the request's `stream` flag
    ///
    /// Batch drops a `stream: true` (the field is then omitted); streaming
    /// forces `stream: true`.
    pub fn apply<R: StreamFlag>(self, mut request: R) -> R {
        match self {
            ResponseMode::Batch => {
                if request.stream_flag() == Some(true) {
                    request.set_stream_flag(None);
                }
            }
            ResponseMode::Streaming => {
                if request.stream_flag() != Some(true) {
                    request.set_stream_flag(Some(true));
                }
            }
        }
        request
    }
}

impl StreamFlag for ChatCompletionRequest {
    fn stream_flag(&self) -> Option<bool> {
        self.stream
    }

    fn set_stream_flag(&mut self, stream: Option<bool>) {
        self.stream = stream;
    }
}

impl StreamFlag for CompletionRequest {
    fn stream_flag(&self) -> Option<bool> {
        self.stream
    }

    fn set_stream_flag(&mut self, stream: Option<bool>) {
        self.stream = stream;
    }
}
