//! Error-aware decoding of completion bodies
//!
//! OpenAI-compatible servers can report a failure inside a successful
//! response: as the whole batch body, or as one `data:` event of a stream.
//! Such `{"error": ...}` payloads are classified like a failed status.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::Result;
use crate::models::classify::classify_failure;
use crate::streaming::{ByteStream, SseStream};

/// A decoded completion body or event
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiEvent<T> {
    Chunk(T),
    Failure { error: Value },
}

impl<T> ApiEvent<T> {
    /// The chunk, or the classified error payload
    pub(crate) fn into_result(self, status: u16, model: &str) -> Result<T> {
        match self {
            ApiEvent::Chunk(chunk) => Ok(chunk),
            ApiEvent::Failure { error } => {
                let body = serde_json::json!({ "error": error }).to_string();
                Err(classify_failure(status, &body, Some(model)))
            }
        }
    }
}

/// Stream of completion chunks from one streamed call
///
/// Ends after `[DONE]`, at the end of the body, or right after the first
/// error it yields.
pub struct CompletionStream<T> {
    events: SseStream<ApiEvent<T>>,
    status: u16,
    model: String,
}

impl<T: DeserializeOwned> CompletionStream<T> {
    pub(crate) fn new(body: ByteStream, status: u16, model: impl Into<String>) -> Self {
        Self {
            events: SseStream::new(body),
            status,
            model: model.into(),
        }
    }

    /// Model named in the request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// True once the transport has been dropped
    pub fn is_released(&self) -> bool {
        self.events.is_released()
    }
}

impl<T: DeserializeOwned> Stream for CompletionStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match ready!(this.events.poll_next_unpin(cx)) {
            Some(Ok(event)) => {
                let item = event.into_result(this.status, &this.model);
                if item.is_err() {
                    this.events.close();
                }
                Poll::Ready(Some(item))
            }
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            None => Poll::Ready(None),
        }
    }
}
