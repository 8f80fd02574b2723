//! Response body tee that stores what the client actually received.
//!
//! [`CaptureBody`] forwards every frame of the inner body unchanged while
//! copying the data into a buffer. When the inner body ends cleanly the whole
//! buffer is handed to a commit callback, exactly once. Any other outcome
//! abandons the capture and the callback is dropped without being called:
//!
//! - the inner body yields an error
//! - the inner body yields trailers (they can't be replayed from the store)
//! - the body is dropped before it ends, e.g. the client went away
//!
//! Hyper may stop polling as soon as [`Body::is_end_stream`] reports `true`,
//! so the commit also runs right after the last data frame and, for bodies
//! that are empty from the start, in [`CaptureBody::new`].

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use pin_project::{pin_project, pinned_drop};
use tracing::debug;

/// How a capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The body ended cleanly and the bytes were committed.
    Committed,
    /// A trailers frame arrived.
    Trailers,
    /// The inner body yielded an error.
    BodyError,
    /// The body was dropped before its end.
    Dropped,
}

/// Receives the full captured body.
pub type CommitFn = Box<dyn FnOnce(Bytes) + Send + 'static>;

/// A body that forwards `B` and captures its bytes.
#[pin_project(PinnedDrop)]
pub struct CaptureBody<B> {
    #[pin]
    inner: B,
    buffer: BytesMut,
    commit: Option<CommitFn>,
}

impl<B: Body> CaptureBody<B> {
    /// Wraps `inner`; `commit` runs once the body has been fully forwarded.
    pub fn new(inner: B, commit: CommitFn) -> Self {
        let mut body = CaptureBody {
            inner,
            buffer: BytesMut::new(),
            commit: Some(commit),
        };
        if body.inner.is_end_stream() {
            if let Some(commit) = body.commit.take() {
                commit(Bytes::new());
            }
        }
        body
    }

    /// Whether the capture is still pending.
    pub fn is_capturing(&self) -> bool {
        self.commit.is_some()
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        match this.inner.as_mut().poll_frame(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(frame))) => {
                let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                match frame.data_ref() {
                    Some(data) => {
                        if this.commit.is_some() {
                            this.buffer.extend_from_slice(data);
                            if this.inner.is_end_stream() {
                                finish(this.commit, this.buffer);
                            }
                        }
                    }
                    None => abandon(this.commit, this.buffer, CaptureOutcome::Trailers),
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(error))) => {
                abandon(this.commit, this.buffer, CaptureOutcome::BodyError);
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                finish(this.commit, this.buffer);
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

fn finish(commit: &mut Option<CommitFn>, buffer: &mut BytesMut) {
    if let Some(commit) = commit.take() {
        debug!(outcome = ?CaptureOutcome::Committed, bytes = buffer.len(), "capture finished");
        commit(buffer.split().freeze());
    }
}

fn abandon(commit: &mut Option<CommitFn>, buffer: &mut BytesMut, outcome: CaptureOutcome) {
    if commit.take().is_some() {
        debug!(?outcome, captured = buffer.len(), "capture abandoned");
        buffer.clear();
    }
}

#[pinned_drop]
impl<B> PinnedDrop for CaptureBody<B> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        abandon(this.commit, this.buffer, CaptureOutcome::Dropped);
    }
}

impl<B> fmt::Debug for CaptureBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureBody")
            .field("captured", &self.buffer.len())
            .field("capturing", &self.commit.is_some())
            .finish()
    }
}
