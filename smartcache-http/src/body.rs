//! Request body buffering that stays transparent to the downstream handler.
//!
//! Fingerprints of POST, PUT and PATCH requests include the request body, so
//! the engine has to read it before the handler runs. A stream can't be
//! "rewound", so whatever was read is kept and replayed:
//!
//! - **Complete**: the body was read to the end; the handler receives the same
//!   bytes from the buffer,
//!   and trailers, if the client sent any
//! - **Partial**: reading failed part-way; the handler receives the prefix that
//!   was read, then the same error at the same position
//! - **Passthrough**: the body was never touched (zero overhead)

use bytes::{Buf, Bytes, BytesMut};
use http::HeaderMap;
use http_body::{Body as HttpBody, Frame};
use http_body_util::BodyExt;
use pin_project::pin_project;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A prefix that was read before the stream failed, followed by the failure.
#[pin_project]
pub struct PartialBufferedBody<B>
where
    B: HttpBody,
{
    prefix: Option<Bytes>,
    error: Option<B::Error>,
}

impl<B> PartialBufferedBody<B>
where
    B: HttpBody,
{
    /// Replays `prefix`, then fails with `error`.
    pub fn new(prefix: Option<Bytes>, error: B::Error) -> Self {
        Self {
            prefix,
            error: Some(error),
        }
    }

    /// The bytes read before the failure, if they haven't been yielded yet.
    pub fn prefix(&self) -> Option<&Bytes> {
        self.prefix.as_ref()
    }
}

impl<B: HttpBody> HttpBody for PartialBufferedBody<B> {
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        if let Some(prefix) = this.prefix.take() {
            return Poll::Ready(Some(Ok(Frame::data(prefix))));
        }

        // Yield the error once, then end the stream
        Poll::Ready(this.error.take().map(Err))
    }

    fn size_hint(&self) -> http_body::SizeHint {
        let prefix_len = self.prefix.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        http_body::SizeHint::with_exact(prefix_len)
    }

    fn is_end_stream(&self) -> bool {
        self.prefix.is_none() && self.error.is_none()
    }
}

/// A request body in one of its consumption states.
///
/// See the [module documentation](self) for the meaning of each variant.
#[pin_project(project = BufferedBodyProj)]
pub enum BufferedBody<B>
where
    B: HttpBody,
{
    /// Body was fully read and buffered.
    ///
    /// The `Option` is used to yield the data once, then return `None` on subsequent polls.
    Complete(Option<Bytes>),

    /// Body was fully read and ended with trailers, yielded after the data.
    Trailing {
        /// Buffered data, taken on first poll.
        data: Option<Bytes>,
        /// Trailers, taken once the data is out.
        trailers: Option<HeaderMap>,
    },

    /// Body was partially read before an error.
    Partial(#[pin] PartialBufferedBody<B>),

    /// Body was passed through without reading.
    Passthrough(#[pin] B),
}

impl<B> HttpBody for BufferedBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            BufferedBodyProj::Complete(data) => {
                Poll::Ready(data.take().map(|bytes| Ok(Frame::data(bytes))))
            }

            BufferedBodyProj::Trailing { data, trailers } => {
                if let Some(bytes) = data.take() {
                    return Poll::Ready(Some(Ok(Frame::data(bytes))));
                }
                Poll::Ready(trailers.take().map(|trailers| Ok(Frame::trailers(trailers))))
            }

            BufferedBodyProj::Partial(partial) => partial.poll_frame(cx),

            BufferedBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            BufferedBody::Complete(Some(bytes)) => {
                http_body::SizeHint::with_exact(bytes.len() as u64)
            }
            BufferedBody::Complete(None) => http_body::SizeHint::with_exact(0),
            BufferedBody::Trailing { data, .. } => {
                http_body::SizeHint::with_exact(data.as_ref().map_or(0, |b| b.len() as u64))
            }
            BufferedBody::Partial(partial) => partial.size_hint(),
            BufferedBody::Passthrough(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            BufferedBody::Complete(None) => true,
            BufferedBody::Complete(Some(_)) => false,
            BufferedBody::Trailing { data, trailers } => data.is_none() && trailers.is_none(),
            BufferedBody::Partial(partial) => partial.is_end_stream(),
            BufferedBody::Passthrough(body) => body.is_end_stream(),
        }
    }
}

impl<B> BufferedBody<B>
where
    B: HttpBody,
{
    /// Reads the whole body into memory.
    ///
    /// Returns the bytes on success. On a stream error returns a
    /// [`BufferedBody::Partial`] holding the prefix read so far and the error,
    /// so the caller can still hand the body on unchanged.
    ///
    /// Trailers are not part of the buffered bytes and are dropped; use
    /// [`collect_with_trailers`](Self::collect_with_trailers) to keep them.
    pub async fn collect(self) -> Result<Bytes, Self> {
        self.collect_with_trailers().await.map(|(bytes, _)| bytes)
    }

    /// Reads the whole body into memory, keeping any trailers.
    ///
    /// Trailer frames are merged in arrival order. Errors behave as in
    /// [`collect`](Self::collect).
    pub async fn collect_with_trailers(self) -> Result<(Bytes, Option<HeaderMap>), Self> {
        match self {
            BufferedBody::Complete(data) => Ok((data.unwrap_or_default(), None)),
            BufferedBody::Trailing { data, trailers } => Ok((data.unwrap_or_default(), trailers)),
            BufferedBody::Partial(partial) => Err(BufferedBody::Partial(partial)),
            BufferedBody::Passthrough(body) => {
                let mut body = Box::pin(body);
                let mut buffer = BytesMut::new();
                let mut trailers: Option<HeaderMap> = None;
                loop {
                    match body.frame().await {
                        Some(Ok(frame)) => match frame.into_data() {
                            Ok(mut data) => {
                                buffer.extend_from_slice(&data.copy_to_bytes(data.remaining()));
                            }
                            Err(frame) => {
                                if let Ok(frame_trailers) = frame.into_trailers() {
                                    trailers
                                        .get_or_insert_with(HeaderMap::new)
                                        .extend(frame_trailers);
                                }
                            }
                        },
                        Some(Err(error)) => {
                            let prefix = (!buffer.is_empty()).then(|| buffer.freeze());
                            return Err(BufferedBody::Partial(PartialBufferedBody::new(
                                prefix, error,
                            )));
                        }
                        None => return Ok((buffer.freeze(), trailers)),
                    }
                }
            }
        }
    }

    /// A body yielding `data` and then `trailers`, if any.
    pub fn buffered(data: Bytes, trailers: Option<HeaderMap>) -> Self {
        let data = Some(data).filter(|data| !data.is_empty());
        match trailers {
            Some(trailers) => BufferedBody::Trailing {
                data,
                trailers: Some(trailers),
            },
            None => BufferedBody::Complete(data),
        }
    }
}

impl<B> fmt::Debug for BufferedBody<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferedBody::Complete(Some(bytes)) => f
                .debug_tuple("Complete")
                .field(&format!("{} bytes", bytes.len()))
                .finish(),
            BufferedBody::Complete(None) => f.debug_tuple("Complete").field(&"consumed").finish(),
            BufferedBody::Trailing { data, trailers } => f
                .debug_struct("Trailing")
                .field("data_len", &data.as_ref().map_or(0, Bytes::len))
                .field("trailers", trailers)
                .finish(),
            BufferedBody::Partial(partial) => {
                let prefix_len = partial.prefix().map(|b| b.len()).unwrap_or(0);
                f.debug_struct("Partial")
                    .field("prefix_len", &prefix_len)
                    .finish()
            }
            BufferedBody::Passthrough(_) => f.debug_tuple("Passthrough").field(&"...").finish(),
        }
    }
}
