//! Newline-delimited JSON decoding
//!
//! Each line is decoded independently, in arrival order. A line that fails
//! to decode terminates the stream with `DecodeFailed`; it is never skipped.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::errors::{ClientError, Result};
use crate::streaming::lines::{ByteStream, LineStream};

/// Stream of records decoded one per line
pub struct NdjsonStream<T> {
    lines: LineStream,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NdjsonStream<T> {
    /// Decode records from a transport byte stream
    pub fn new(inner: ByteStream) -> Self {
        Self::from_lines(LineStream::new(inner))
    }

    /// Decode records from an existing line stream
    pub fn from_lines(lines: LineStream) -> Self {
        Self {
            lines,
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

impl<T: DeserializeOwned> Stream for NdjsonStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match ready!(this.lines.poll_next_unpin(cx)) {
            Some(Ok(line)) => match serde_json::from_slice::<T>(&line) {
                Ok(record) => Poll::Ready(Some(Ok(record))),
                Err(e) => {
                    tracing::warn!("Malformed line in JSON stream: {}", e);
                    this.lines.close();
                    Poll::Ready(Some(Err(ClientError::decode(&e, &line))))
                }
            },
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;
    use quickcheck_macros::quickcheck;
    use serde::Deserialize;
    use tokio_test::{assert_pending, assert_ready};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Status {
        status: String,
    }

    const BODY: &str = "{\"status\":\"pulling manifest\"}\n\
        {\"status\":\"pulling fa8235e5b48f\"}\n\
        {\"status\":\"verifying sha256 digest\"}\n\
        {\"status\":\"writing manifest\"}\n\
        {\"status\":\"success\"}\n";

    fn body_in_chunks(body: &[u8], cuts: &[usize]) -> ByteStream {
        let mut points: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut parts = Vec::new();
        let mut start = 0;
        for p in points.into_iter().chain(std::iter::once(body.len())) {
            parts.push(Ok(Bytes::copy_from_slice(&body[start..p])));
            start = p;
        }
        stream::iter(parts).boxed()
    }

    #[tokio::test]
    async fn test_decodes_each_line_in_order() {
        let records: Vec<Status> = NdjsonStream::new(body_in_chunks(BODY.as_bytes(), &[]))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].status, "pulling manifest");
        assert_eq!(records[4].status, "success");
    }

    #[tokio::test]
    async fn test_malformed_line_fails_stream() {
        let body = b"{\"status\":\"a\"}\n{\"status\": oops}\n{\"status\":\"c\"}\n";
        let mut records = NdjsonStream::<Status>::new(body_in_chunks(body, &[]));

        assert!(records.next().await.unwrap().is_ok());
        match records.next().await {
            Some(Err(ClientError::DecodeFailed { snippet, .. })) => {
                assert!(snippet.contains("oops"));
            }
            other => panic!("expected decode failure, got {other:?}"),
        }
        assert!(records.is_released());
        assert!(records.next().await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_decode_failure() {
        let mut records = NdjsonStream::<Status>::new(body_in_chunks(b"{\"total\":12}\n", &[]));
        assert!(matches!(
            records.next().await,
            Some(Err(ClientError::DecodeFailed { .. }))
        ));
    }

    #[test]
    fn test_no_item_before_line_is_complete() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Bytes>>();
        let inner = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        })
        .boxed();
        let mut records = tokio_test::task::spawn(NdjsonStream::<Status>::new(inner));

        assert_pending!(records.poll_next());

        tx.send(Ok(Bytes::from_static(b"{\"status\":\"pull"))).unwrap();
        assert_pending!(records.poll_next());

        tx.send(Ok(Bytes::from_static(b"ing manifest\"}"))).unwrap();
        assert_pending!(records.poll_next());

        tx.send(Ok(Bytes::from_static(b"\n{\"status\""))).unwrap();
        let first = assert_ready!(records.poll_next());
        assert_eq!(first.unwrap().unwrap().status, "pulling manifest");
        assert_pending!(records.poll_next());

        drop(tx);
        let tail = assert_ready!(records.poll_next());
        assert!(matches!(tail, Some(Err(ClientError::DecodeFailed { .. }))));
    }

    #[quickcheck]
    fn prop_chunk_boundaries_do_not_matter(cuts: Vec<usize>) -> bool {
        let statuses: Vec<String> = tokio_test::block_on(
            NdjsonStream::<Status>::new(body_in_chunks(BODY.as_bytes(), &cuts))
                .map(|r| r.map(|s| s.status).unwrap_or_default())
                .collect(),
        );

        statuses
            == vec![
                "pulling manifest",
                "pulling fa8235e5b48f",
                "verifying sha256 digest",
                "writing manifest",
                "success",
            ]
    }
}
