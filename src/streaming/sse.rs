//! Server-sent event decoding for OpenAI-compatible streaming endpoints
//!
//! Only `data:` lines carry records. `event:`, `id:`, `retry:` and comment
//! lines are ignored. The `[DONE]` sentinel ends the stream normally.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::errors::{ClientError, Result};
use crate::streaming::lines::{ByteStream, LineStream};

/// End-of-stream sentinel sent in place of a JSON chunk
pub const DONE_MARKER: &str = "[DONE]";

/// Stream of records decoded from SSE `data:` lines
pub struct SseStream<T> {
    lines: LineStream,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> SseStream<T> {
    /// Decode events from a transport byte stream
    pub fn new(inner: ByteStream) -> Self {
        Self {
            lines: LineStream::new(inner),
            _record: PhantomData,
        }
    }

    /// Stop reading and release the transport
    pub fn close(&mut self) {
        self.lines.close();
    }

    /// True once the transport has been dropped
    pub fn is_released(&self) -> bool {
        self.lines.is_released()
    }
}

/// Extract the payload of a `data:` line
fn data_payload(line: &[u8]) -> Option<&[u8]> {
    let rest = line.strip_prefix(b"data:")?;
    Some(rest.strip_prefix(b" ").unwrap_or(rest))
}

impl<T: DeserializeOwned> Stream for SseStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let line = match ready!(this.lines.poll_next_unpin(cx)) {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => return Poll::Ready(None),
            };

            let Some(payload) = data_payload(&line) else {
                continue;
            };

            if is_done(payload) {
                tracing::debug!("Event stream finished");
                this.lines.close();
                return Poll::Ready(None);
            }

            return match serde_json::from_slice::<T>(payload) {
                Ok(record) => Poll::Ready(Some(Ok(record))),
                Err(e) => {
                    this.lines.close();
                    Poll::Ready(Some(Err(ClientError::decode(&e, payload))))
                }
            };
        }
    }
}

fn is_done(payload: &[u8]) -> bool {
    std::str::from_utf8(payload).map(str::trim) == Ok(DONE_MARKER)
}
