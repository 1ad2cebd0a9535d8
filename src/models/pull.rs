//! Streaming model pull
//!
//! A [`PullStream`] is lazy: the pull request is only sent when the stream
//! is first polled. It then yields one [`PullProgressLine`] per response
//! line and ends right after the `"success"` line. Dropping it at any point
//! closes the connection.
//!
//! Byte counts are checked as they arrive: `completed` may not exceed
//! `total`, and may not go backwards for a digest. A line breaking either
//! rule ends the stream with `DecodeFailed`.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream, StreamExt};

use crate::errors::{snippet, ClientError, Result};
use crate::models::classify::classify_failure;
use crate::models::types::{PullProgressLine, PullStreamLine};
use crate::streaming::{ByteStream, NdjsonStream};

/// Pending request that resolves to the response status and body stream
pub type PullConnect = BoxFuture<'static, Result<(u16, ByteStream)>>;

enum PullState {
    Connecting(PullConnect),
    Streaming {
        status: u16,
        lines: NdjsonStream<PullStreamLine>,
    },
    Failed(Option<ClientError>),
    Done,
}

/// Lazy, ordered stream of pull progress
pub struct PullStream {
    model: String,
    state: PullState,
    received: usize,
    /// Highest `completed` seen per digest
    high_water: HashMap<String, u64>,
}

impl PullStream {
    /// Stream that connects with `connect` on first poll
    pub fn new(model: impl Into<String>, connect: PullConnect) -> Self {
        Self {
            model: model.into(),
            state: PullState::Connecting(connect),
            received: 0,
            high_water: HashMap::new(),
        }
    }

    /// Stream over an already-open response body
    pub fn from_body(model: impl Into<String>, status: u16, body: ByteStream) -> Self {
        Self {
            model: model.into(),
            state: PullState::Streaming {
                status,
                lines: NdjsonStream::new(body),
            },
            received: 0,
            high_water: HashMap::new(),
        }
    }

    /// Stream that yields `err` once and ends
    pub fn failed(model: impl Into<String>, err: ClientError) -> Self {
        Self {
            model: model.into(),
            state: PullState::Failed(Some(err)),
            received: 0,
            high_water: HashMap::new(),
        }
    }

    /// Name of the model being pulled
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of progress lines delivered so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// True once the stream has ended, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self.state, PullState::Done)
    }
}

impl Stream for PullStream {
    type Item = Result<PullProgressLine>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                PullState::Connecting(connect) => match ready!(connect.poll_unpin(cx)) {
                    Ok((status, body)) => {
                        tracing::debug!("Pull of {} streaming (HTTP {})", this.model, status);
                        this.state = PullState::Streaming {
                            status,
                            lines: NdjsonStream::new(body),
                        };
                    }
                    Err(e) => {
                        this.state = PullState::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                PullState::Streaming { status, lines } => {
                    let status = *status;
                    match ready!(lines.poll_next_unpin(cx)) {
                        Some(Ok(PullStreamLine::Progress(line))) => {
                            if let Err(e) = check_counts(&mut this.high_water, &line) {
                                tracing::warn!("Pull of {} sent inconsistent progress", this.model);
                                this.state = PullState::Done;
                                return Poll::Ready(Some(Err(e)));
                            }
                            this.received += 1;
                            if line.is_terminal() {
                                tracing::info!(
                                    "Pulled model {} ({} progress lines)",
                                    this.model,
                                    this.received
                                );
                                this.state = PullState::Done;
                            }
                            return Poll::Ready(Some(Ok(line)));
                        }
                        Some(Ok(PullStreamLine::Failure { error })) => {
                            this.state = PullState::Done;
                            let body = serde_json::json!({ "error": error }).to_string();
                            return Poll::Ready(Some(Err(classify_failure(
                                status,
                                &body,
                                Some(&this.model),
                            ))));
                        }
                        Some(Err(e)) => {
                            this.state = PullState::Done;
                            return Poll::Ready(Some(Err(e)));
                        }
                        None => {
                            this.state = PullState::Done;
                            tracing::error!(
                                "Pull of {} ended after {} lines without completing",
                                this.model,
                                this.received
                            );
                            return Poll::Ready(Some(Err(ClientError::TransportFailed(format!(
                                "pull of '{}' ended before completion",
                                this.model
                            )))));
                        }
                    }
                }
                PullState::Failed(err) => {
                    let err = err.take();
                    this.state = PullState::Done;
                    return Poll::Ready(err.map(Err));
                }
                PullState::Done => return Poll::Ready(None),
            }
        }
    }
}

/// Reject byte counts past the total or behind an earlier line's
fn check_counts(high_water: &mut HashMap<String, u64>, line: &PullProgressLine) -> Result<()> {
    let Some(completed) = line.completed else {
        return Ok(());
    };

    let reason = match (line.total, &line.digest) {
        (Some(total), _) if completed > total => Some(format!(
            "completed {} exceeds total {}",
            completed, total
        )),
        (_, Some(digest)) => match high_water.get(digest) {
            Some(&seen) if completed < seen => Some(format!(
                "completed for {} went back from {} to {}",
                digest, seen, completed
            )),
            _ => {
                high_water.insert(digest.clone(), completed);
                None
            }
        },
        _ => None,
    };

    match reason {
        Some(reason) => Err(ClientError::DecodeFailed {
            reason,
            snippet: snippet(&serde_json::to_string(line).unwrap_or_default()),
        }),
        None => Ok(()),
    }
}

impl fmt::Debug for PullStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            PullState::Connecting(_) => "connecting",
            PullState::Streaming { .. } => "streaming",
            PullState::Failed(_) => "failed",
            PullState::Done => "done",
        };
        f.debug_struct("PullStream")
            .field("model", &self.model)
            .field("state", &state)
            .field("received", &self.received)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::{future, stream, FutureExt};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Transport stand-in that counts reads and reports when it is dropped
    struct TrackedBody {
        chunks: VecDeque<Bytes>,
        reads: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
    }

    impl Stream for TrackedBody {
        type Item = Result<Bytes>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let this = self.get_mut();
            let next = this.chunks.pop_front();
            if next.is_some() {
                this.reads.fetch_add(1, Ordering::SeqCst);
            }
            Poll::Ready(next.map(Ok))
        }
    }

    impl Drop for TrackedBody {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(lines: &[&str]) -> (ByteStream, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let body = TrackedBody {
            chunks: lines
                .iter()
                .map(|l| Bytes::from(format!("{l}\n")))
                .collect(),
            reads: Arc::clone(&reads),
            released: Arc::clone(&released),
        };
        (body.boxed(), reads, released)
    }

    const PULL_LINES: &[&str] = &[
        r#"{"status":"pulling manifest"}"#,
        r#"{"status":"pulling d47ab88b61ba","digest":"sha256:d47ab88b61ba","total":140}"#,
        r#"{"status":"pulling d47ab88b61ba","digest":"sha256:d47ab88b61ba","total":140,"completed":70}"#,
        r#"{"status":"pulling d47ab88b61ba","digest":"sha256:d47ab88b61ba","total":140,"completed":140}"#,
        r#"{"status":"verifying sha256 digest"}"#,
        r#"{"status":"writing manifest"}"#,
        r#"{"status":"success"}"#,
    ];

    #[tokio::test]
    async fn test_full_pull() {
        let (body, _, released) = tracked(PULL_LINES);
        let mut pull = PullStream::from_body("llama3", 200, body);

        let mut statuses = Vec::new();
        while let Some(line) = pull.next().await {
            statuses.push(line.unwrap().status);
        }

        assert_eq!(statuses.len(), PULL_LINES.len());
        assert_eq!(statuses.first().unwrap(), "pulling manifest");
        assert_eq!(statuses.last().unwrap(), "success");
        assert_eq!(pull.received(), PULL_LINES.len());
        assert!(pull.is_finished());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_nothing_after_success() {
        let (body, reads, released) =
            tracked(&[r#"{"status":"success"}"#, r#"{"status":"stray"}"#]);
        let lines: Vec<_> = PullStream::from_body("llama3", 200, body).collect().await;

        assert_eq!(lines.len(), 1);
        assert!(lines[0].as_ref().unwrap().is_terminal());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancellation_releases_connection() {
        let (body, reads, released) = tracked(PULL_LINES);
        let mut pull = PullStream::from_body("llama3", 200, body);

        for _ in 0..3 {
            assert!(pull.next().await.unwrap().is_ok());
        }
        assert_eq!(reads.load(Ordering::SeqCst), 3);
        assert!(!released.load(Ordering::SeqCst));

        drop(pull);

        assert!(released.load(Ordering::SeqCst));
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_line_fails_pull() {
        let (body, _, released) = tracked(&[
            r#"{"status":"pulling manifest"}"#,
            r#"{"status":"pulling","total":"lots"}"#,
            r#"{"status":"success"}"#,
        ]);
        let lines: Vec<_> = PullStream::from_body("llama3", 200, body).collect().await;

        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_ok());
        assert!(matches!(lines[1], Err(ClientError::DecodeFailed { .. })));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_error_line_mid_stream() {
        let (body, _, _) = tracked(&[
            r#"{"status":"pulling manifest"}"#,
            r#"{"error":"pull model manifest: file does not exist"}"#,
        ]);
        let lines: Vec<_> = PullStream::from_body("dummy", 200, body).collect().await;

        assert_eq!(lines.len(), 2);
        match &lines[1] {
            Err(ClientError::ModelNotFound { name, .. }) => assert_eq!(name, "dummy"),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_completed_past_total_fails_pull() {
        let (body, _, released) = tracked(&[
            r#"{"status":"pulling abc","digest":"sha256:abc","total":10,"completed":8}"#,
            r#"{"status":"pulling abc","digest":"sha256:abc","total":10,"completed":999}"#,
            r#"{"status":"success"}"#,
        ]);
        let lines: Vec<_> = PullStream::from_body("llama3", 200, body).collect().await;

        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_ok());
        match &lines[1] {
            Err(ClientError::DecodeFailed { reason, .. }) => assert!(reason.contains("exceeds")),
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_completed_going_backwards_fails_pull() {
        let (body, _, _) = tracked(&[
            r#"{"status":"pulling abc","digest":"sha256:abc","total":10,"completed":8}"#,
            r#"{"status":"pulling abc","digest":"sha256:abc","total":10,"completed":3}"#,
        ]);
        let lines: Vec<_> = PullStream::from_body("llama3", 200, body).collect().await;

        assert_eq!(lines.len(), 2);
        assert!(matches!(lines[1], Err(ClientError::DecodeFailed { .. })));
    }

    #[tokio::test]
    async fn test_counts_tracked_per_digest() {
        let (body, _, _) = tracked(&[
            r#"{"status":"pulling abc","digest":"sha256:abc","total":10,"completed":10}"#,
            r#"{"status":"pulling def","digest":"sha256:def","total":20,"completed":2}"#,
            r#"{"status":"pulling def","digest":"sha256:def","total":20,"completed":2}"#,
            r#"{"status":"success"}"#,
        ]);
        let lines: Vec<_> = PullStream::from_body("llama3", 200, body).collect().await;

        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.is_ok()));
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let (body, _, _) = tracked(&PULL_LINES[..3]);
        let lines: Vec<_> = PullStream::from_body("llama3", 200, body).collect().await;

        assert_eq!(lines.len(), 4);
        assert!(matches!(lines[3], Err(ClientError::TransportFailed(_))));
    }

    #[tokio::test]
    async fn test_connect_failure_yields_no_items() {
        let connect: PullConnect = future::ready(Err(ClientError::ModelNotFound {
            name: "dummy".to_string(),
            message: "pull model manifest: file does not exist".to_string(),
        }))
        .boxed();
        let lines: Vec<_> = PullStream::new("dummy", connect).collect().await;

        assert_eq!(lines.len(), 1);
        assert!(lines[0].as_ref().unwrap_err().is_not_found());
    }

    #[test]
    fn test_lazy_until_polled() {
        let polled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&polled);
        let connect: PullConnect = Box::pin(async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, ClientError>((200u16, stream::empty::<Result<Bytes>>().boxed()))
        });

        let pull = PullStream::new("llama3", connect);
        assert!(!polled.load(Ordering::SeqCst));

        let mut pull = tokio_test::task::spawn(pull);
        let _ = pull.poll_next();
        assert!(polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_stream() {
        let mut pull = PullStream::failed("", ClientError::InvalidInput("empty".to_string()));
        assert!(matches!(
            pull.next().await,
            Some(Err(ClientError::InvalidInput(_)))
        ));
        assert!(pull.next().await.is_none());
        assert!(pull.is_finished());
    }
}
