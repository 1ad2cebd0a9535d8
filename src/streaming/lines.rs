//! Line stream over a transport byte stream
//!
//! Owns the transport stream for as long as lines may still arrive. The
//! transport is dropped (releasing its connection) as soon as the body ends,
//! a read fails, or the owner calls [`LineStream::close`].

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};

use crate::errors::Result;
use crate::streaming::parser::LineParser;

/// Raw response body as delivered by the transport
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Stream of complete, non-blank lines
pub struct LineStream {
    inner: Option<ByteStream>,
    parser: LineParser,
}

impl LineStream {
    /// Wrap a transport byte stream
    pub fn new(inner: ByteStream) -> Self {
        Self::with_parser(inner, LineParser::new())
    }

    /// Wrap a transport byte stream with a custom parser
    pub fn with_parser(inner: ByteStream, parser: LineParser) -> Self {
        Self {
            inner: Some(inner),
            parser,
        }
    }

    /// Drop the transport and discard any buffered bytes
    pub fn close(&mut self) {
        self.inner = None;
        self.parser.clear();
    }

    /// True once the transport has been dropped
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl Stream for LineStream {
    type Item = Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(line) = this.parser.next_line() {
                return Poll::Ready(Some(Ok(line)));
            }

            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(this.parser.finish().map(Ok));
            };

            match ready!(inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    if let Err(e) = this.parser.add_bytes(&chunk) {
                        this.close();
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("Stream read failed: {}", e);
                    this.close();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.inner = None;
                }
            }
        }
    }
}
