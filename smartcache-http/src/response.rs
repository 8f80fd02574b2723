//! Conversion between live responses and [`CachedResponse`].

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use http::response::Parts;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;
use smartcache_core::CachedResponse;
use tracing::debug;

use crate::capture::CaptureBody;
use crate::error::ReplayError;

/// Header marking a response served from the cache.
pub const CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-smartapiresponsecache");

/// Value of [`CACHE_HIT_HEADER`].
pub const CACHE_HIT_VALUE: HeaderValue = HeaderValue::from_static("HIT");

/// Content type assumed for replayed entries that were stored without one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/json";

/// The `Content-Type` of a header map, or `""`.
pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Snapshots a response head; the body is filled in once captured.
///
/// `Set-Cookie` is never stored: replaying it would hand one client's
/// cookies to the next.
pub fn cached_head(parts: &Parts) -> CachedResponse {
    let mut cached = CachedResponse::new(
        parts.status.as_u16(),
        content_type(&parts.headers),
        Bytes::new(),
    );
    for (name, value) in parts.headers.iter() {
        if name == SET_COOKIE {
            continue;
        }
        match value.to_str() {
            Ok(value) => cached = cached.with_header(name.as_str(), value),
            Err(_) => debug!(header = %name, "non-text header value not stored"),
        }
    }
    cached
}

/// Rebuilds a response from a stored entry.
///
/// Stored headers are replayed first, then `Content-Type` and the HIT marker
/// are set. 204 and 205 responses get neither a body nor a content type.
pub fn replay<B>(cached: CachedResponse) -> Result<Response<ResponseBody<B>>, ReplayError>
where
    B: HttpBody,
{
    let status = StatusCode::from_u16(cached.status)
        .map_err(|_| ReplayError::InvalidStatus(cached.status))?;
    let bodiless = cached.is_bodiless();

    let mut headers = HeaderMap::new();
    for (name, values) in &cached.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            debug!(header = %name, "invalid stored header name skipped");
            continue;
        };
        if bodiless && (name == CONTENT_TYPE || name == CONTENT_LENGTH) {
            continue;
        }
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => debug!(header = %name, "invalid stored header value skipped"),
            }
        }
    }

    if !bodiless {
        let content_type = if cached.content_type.is_empty() {
            HeaderValue::from_static(FALLBACK_CONTENT_TYPE)
        } else {
            HeaderValue::from_str(&cached.content_type)
                .map_err(|_| ReplayError::InvalidContentType(cached.content_type.clone()))?
        };
        headers.insert(CONTENT_TYPE, content_type);
    }
    headers.insert(CACHE_HIT_HEADER, CACHE_HIT_VALUE);

    let body = if bodiless || cached.body.is_empty() {
        None
    } else {
        Some(cached.body)
    };

    let mut response = Response::new(ResponseBody::Replay(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Body of a response leaving the cache layer.
#[pin_project(project = ResponseBodyProj)]
pub enum ResponseBody<B> {
    /// Stored bytes, yielded once.
    Replay(Option<Bytes>),
    /// The handler's body, untouched.
    Passthrough(#[pin] B),
    /// The handler's body, captured for the store on the way out.
    Capture(#[pin] CaptureBody<B>),
}

impl<B> HttpBody for ResponseBody<B>
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
            ResponseBodyProj::Replay(data) => {
                Poll::Ready(data.take().map(|bytes| Ok(Frame::data(bytes))))
            }
            ResponseBodyProj::Passthrough(body) => body.poll_frame(cx).map(|frame| {
                frame.map(|result| {
                    result.map(|frame| {
                        frame.map_data(|mut data| data.copy_to_bytes(data.remaining()))
                    })
                })
            }),
            ResponseBodyProj::Capture(body) => body.poll_frame(cx),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            ResponseBody::Replay(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            ResponseBody::Replay(None) => SizeHint::with_exact(0),
            ResponseBody::Passthrough(body) => body.size_hint(),
            ResponseBody::Capture(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            ResponseBody::Replay(data) => data.is_none(),
            ResponseBody::Passthrough(body) => body.is_end_stream(),
            ResponseBody::Capture(body) => body.is_end_stream(),
        }
    }
}

impl<B> fmt::Debug for ResponseBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Replay(data) => f
                .debug_tuple("Replay")
                .field(&data.as_ref().map(Bytes::len).unwrap_or(0))
                .finish(),
            ResponseBody::Passthrough(_) => f.debug_tuple("Passthrough").finish(),
            ResponseBody::Capture(body) => f.debug_tuple("Capture").field(body).finish(),
        }
    }
}
