use std::sync::Arc;
use std::task::{Context, Poll};

use http::{Request, Response};
use http_body::Body as HttpBody;
use smartcache_core::{PolicyResolver, ResponseStore, RouteDescriptor};
use smartcache_http::{BufferedBody, KeyGenerator, ResponseBody};
use tower::Service;

use crate::future::CacheFuture;

/// Service produced by [`SmartCache`](crate::SmartCache).
///
/// Serves stored responses for cacheable requests and captures upstream
/// responses on a miss. Requests that aren't cacheable reach the upstream
/// with their body untouched.
pub struct CacheService<S, St> {
    upstream: S,
    store: Arc<St>,
    resolver: PolicyResolver,
    keys: KeyGenerator,
    route: Option<RouteDescriptor>,
}

impl<S, St> CacheService<S, St> {
    /// Wraps `upstream`.
    ///
    /// `route` describes requests that carry no [`RouteDescriptor`] extension.
    pub fn new(
        upstream: S,
        store: Arc<St>,
        resolver: PolicyResolver,
        route: Option<RouteDescriptor>,
    ) -> Self {
        CacheService {
            upstream,
            store,
            keys: KeyGenerator::new(resolver.clone()),
            resolver,
            route,
        }
    }
}

impl<S, St> Clone for CacheService<S, St>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            store: self.store.clone(),
            resolver: self.resolver.clone(),
            keys: self.keys.clone(),
            route: self.route.clone(),
        }
    }
}

impl<S, St, ReqBody, ResBody> Service<Request<ReqBody>> for CacheService<S, St>
where
    S: Service<Request<BufferedBody<ReqBody>>, Response = Response<ResBody>> + Clone,
    St: ResponseStore + 'static,
    ReqBody: HttpBody + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Send,
    ResBody: HttpBody,
{
    type Response = Response<ResponseBody<ResBody>>;
    type Error = S::Error;
    type Future = CacheFuture<S, St, ReqBody, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The driven instance is the one that was polled ready
        let clone = self.upstream.clone();
        let upstream = std::mem::replace(&mut self.upstream, clone);

        CacheFuture::new(
            upstream,
            self.store.clone(),
            self.resolver.clone(),
            self.keys.clone(),
            self.route.clone(),
            req,
        )
    }
}
