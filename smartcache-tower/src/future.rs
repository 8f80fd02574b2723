//! Per-request state machine.
//!
//! ```text
//! Initial ──(not cacheable)──────────────────────────► PollUpstream ─► passthrough body
//!    │
//!    └─(cacheable)─► Fingerprint ─► lookup ─(hit)───► replayed response
//!                                      │
//!                                      └─(miss)─────► PollUpstream ─► capture body
//! ```
//!
//! Lookup is synchronous and happens right after the fingerprint resolves.
//! A store read error is logged and treated as a miss.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::ready;
use http::{Request, Response};
use http_body::Body as HttpBody;
use pin_project::pin_project;
use smartcache_core::{
    CacheKey, CachedResponse, Fingerprint, PolicyResolver, ResponseStore, RouteDescriptor,
    RoutePolicy,
};
use smartcache_http::{
    BufferedBody, CaptureBody, KeyGenerator, ResponseBody, cached_head, content_type, replay,
};
use tower::Service;
use tracing::{debug, warn};

use crate::metrics;

const POLL_AFTER_READY_ERROR: &str = "CacheFuture can't be polled after finishing";
const UPSTREAM_TAKEN_ERROR: &str = "Upstream already called for this request";

type FingerprintFuture<B> = BoxFuture<'static, (Request<BufferedBody<B>>, Option<Fingerprint>)>;

/// Where a response goes once the upstream has produced its head.
#[derive(Debug)]
struct Capture {
    key: CacheKey,
    ttl: Duration,
}

#[pin_project(project = StateProj)]
enum State<F, B>
where
    B: HttpBody,
{
    /// Deciding whether the request is cacheable at all
    Initial { request: Option<Request<B>> },
    /// Buffering what the key needs
    Fingerprint {
        #[pin]
        future: FingerprintFuture<B>,
        policy: RoutePolicy,
    },
    /// Waiting for the wrapped service
    PollUpstream {
        #[pin]
        future: F,
        capture: Option<Capture>,
        started: Instant,
    },
    Done,
}

/// Future returned by [`CacheService`](crate::CacheService).
#[pin_project]
pub struct CacheFuture<S, St, ReqBody, ResBody>
where
    S: Service<Request<BufferedBody<ReqBody>>, Response = Response<ResBody>>,
    ReqBody: HttpBody,
{
    upstream: Option<S>,
    store: Arc<St>,
    resolver: PolicyResolver,
    keys: KeyGenerator,
    route: Option<RouteDescriptor>,
    #[pin]
    state: State<S::Future, ReqBody>,
    _response: PhantomData<fn() -> ResBody>,
}

impl<S, St, ReqBody, ResBody> CacheFuture<S, St, ReqBody, ResBody>
where
    S: Service<Request<BufferedBody<ReqBody>>, Response = Response<ResBody>>,
    ReqBody: HttpBody,
{
    pub(crate) fn new(
        upstream: S,
        store: Arc<St>,
        resolver: PolicyResolver,
        keys: KeyGenerator,
        route: Option<RouteDescriptor>,
        request: Request<ReqBody>,
    ) -> Self {
        CacheFuture {
            upstream: Some(upstream),
            store,
            resolver,
            keys,
            route,
            state: State::Initial {
                request: Some(request),
            },
            _response: PhantomData,
        }
    }
}

impl<S, St, ReqBody, ResBody> Future for CacheFuture<S, St, ReqBody, ResBody>
where
    S: Service<Request<BufferedBody<ReqBody>>, Response = Response<ResBody>>,
    St: ResponseStore + 'static,
    ReqBody: HttpBody + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Send,
    ResBody: HttpBody,
{
    type Output = Result<Response<ResponseBody<ResBody>>, S::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        loop {
            let state = match this.state.as_mut().project() {
                StateProj::Initial { request } => {
                    let request = request.take().expect(POLL_AFTER_READY_ERROR);
                    let route = request
                        .extensions()
                        .get::<RouteDescriptor>()
                        .or(this.route.as_ref())
                        .filter(|route| this.resolver.should_cache(route, request.method()))
                        .map(|route| route.policy().clone());

                    match route {
                        Some(policy) => {
                            let keys = this.keys.clone();
                            let key_policy = policy.clone();
                            let request = request.map(BufferedBody::Passthrough);
                            let future: FingerprintFuture<ReqBody> =
                                Box::pin(async move { keys.fingerprint(request, &key_policy).await });
                            State::Fingerprint { future, policy }
                        }
                        None => {
                            debug!(method = %request.method(), uri = %request.uri(), "request not cacheable, passing through");
                            metrics::record_passthrough();
                            let upstream = this.upstream.as_mut().expect(UPSTREAM_TAKEN_ERROR);
                            State::PollUpstream {
                                future: upstream.call(request.map(BufferedBody::Passthrough)),
                                capture: None,
                                started: Instant::now(),
                            }
                        }
                    }
                }
                StateProj::Fingerprint { future, policy } => {
                    let (request, fingerprint) = ready!(future.poll(cx));
                    let ttl = this.resolver.resolve_ttl(policy);
                    let capture = match fingerprint {
                        Some(fingerprint) => {
                            let key = fingerprint.to_key();
                            if let Some(response) = lookup(this.store.as_ref(), &key) {
                                debug!(%key, "cache hit");
                                metrics::record_hit(this.store.label());
                                this.state.set(State::Done);
                                return Poll::Ready(Ok(response));
                            }
                            debug!(%key, "cache miss");
                            metrics::record_miss(this.store.label());
                            Some(Capture { key, ttl })
                        }
                        None => {
                            metrics::record_passthrough();
                            None
                        }
                    };
                    let upstream = this.upstream.as_mut().expect(UPSTREAM_TAKEN_ERROR);
                    State::PollUpstream {
                        future: upstream.call(request),
                        capture,
                        started: Instant::now(),
                    }
                }
                StateProj::PollUpstream {
                    future,
                    capture,
                    started,
                } => {
                    let result = ready!(future.poll(cx));
                    metrics::record_upstream_duration(started.elapsed());
                    let capture = capture.take();
                    this.state.set(State::Done);
                    let result = result.map(|response| match capture {
                        Some(capture) => {
                            prepare_capture(response, capture, this.store, this.resolver)
                        }
                        None => response.map(ResponseBody::Passthrough),
                    });
                    return Poll::Ready(result);
                }
                StateProj::Done => panic!("{}", POLL_AFTER_READY_ERROR),
            };
            this.state.set(state);
        }
    }
}

fn lookup<St, B>(store: &St, key: &CacheKey) -> Option<Response<ResponseBody<B>>>
where
    St: ResponseStore,
    B: HttpBody,
{
    let entry = match store.get(key) {
        Ok(entry) => entry?,
        Err(error) => {
            warn!(store = store.label(), %key, %error, "cache read failed, treating as miss");
            metrics::record_store_error(store.label(), "read");
            return None;
        }
    };
    match replay(entry.into_inner()) {
        Ok(response) => Some(response),
        Err(error) => {
            warn!(store = store.label(), %key, %error, "cached entry can't be replayed, treating as miss");
            None
        }
    }
}

/// Wraps the body of a cacheable response so it is stored once fully sent.
fn prepare_capture<St, B>(
    response: Response<B>,
    capture: Capture,
    store: &Arc<St>,
    resolver: &PolicyResolver,
) -> Response<ResponseBody<B>>
where
    St: ResponseStore + 'static,
    B: HttpBody,
{
    let (parts, body) = response.into_parts();
    let content_type = content_type(&parts.headers);
    if !resolver.is_cacheable_status(parts.status)
        || !resolver.is_cacheable_content_type(content_type)
    {
        debug!(
            key = %capture.key,
            status = parts.status.as_u16(),
            content_type,
            "response not cacheable"
        );
        return Response::from_parts(parts, ResponseBody::Passthrough(body));
    }

    let mut head: CachedResponse = cached_head(&parts);
    let store = Arc::clone(store);
    let Capture { key, ttl } = capture;
    let commit = Box::new(move |bytes| {
        head.body = bytes;
        match store.put(&key, head, ttl) {
            Ok(()) => debug!(store = store.label(), %key, ?ttl, "response stored"),
            Err(error) => {
                warn!(store = store.label(), %key, %error, "failed to store response");
                metrics::record_store_error(store.label(), "write");
            }
        }
    });
    Response::from_parts(parts, ResponseBody::Capture(CaptureBody::new(body, commit)))
}
