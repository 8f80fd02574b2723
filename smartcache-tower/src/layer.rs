use std::sync::Arc;

use smartcache_core::{EngineConfig, PolicyResolver, ResponseStore, RouteDescriptor};
use smartcache_moka::MokaStore;
use tower::Layer;

use crate::service::CacheService;

/// Marker type for a builder without a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

/// Tower [`Layer`] adding response caching to a service.
///
/// The store and configuration are shared between every service the layer
/// produces.
pub struct SmartCache<St> {
    store: Arc<St>,
    resolver: PolicyResolver,
    route: Option<RouteDescriptor>,
}

impl<St> Clone for SmartCache<St> {
    fn clone(&self) -> Self {
        SmartCache {
            store: Arc::clone(&self.store),
            resolver: self.resolver.clone(),
            route: self.route.clone(),
        }
    }
}

impl<St> SmartCache<St> {
    /// Creates a layer over `store` with the given configuration.
    pub fn new(store: St, config: EngineConfig) -> Self {
        SmartCache {
            store: Arc::new(store),
            resolver: PolicyResolver::new(Arc::new(config)),
            route: None,
        }
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<St> {
        &self.store
    }
}

impl SmartCache<NotSet> {
    /// Starts a builder with the default [`EngineConfig`].
    pub fn builder() -> SmartCacheBuilder<NotSet> {
        SmartCacheBuilder::default()
    }
}

impl<S, St> Layer<S> for SmartCache<St> {
    type Service = CacheService<S, St>;

    fn layer(&self, upstream: S) -> Self::Service {
        CacheService::new(
            upstream,
            Arc::clone(&self.store),
            self.resolver.clone(),
            self.route.clone(),
        )
    }
}

/// Fluent builder for [`SmartCache`].
pub struct SmartCacheBuilder<St> {
    store: St,
    config: EngineConfig,
    route: Option<RouteDescriptor>,
}

impl Default for SmartCacheBuilder<NotSet> {
    fn default() -> Self {
        Self {
            store: NotSet,
            config: EngineConfig::default(),
            route: None,
        }
    }
}

impl<St> SmartCacheBuilder<St> {
    /// Uses `store` for entries.
    pub fn store<NS: ResponseStore>(self, store: NS) -> SmartCacheBuilder<NS> {
        SmartCacheBuilder {
            store,
            config: self.config,
            route: self.route,
        }
    }

    /// Uses an in-memory [`MokaStore`] holding at most `max_entries` responses.
    pub fn in_memory(self, max_entries: u64) -> SmartCacheBuilder<MokaStore> {
        self.store(MokaStore::builder().max_entries(max_entries).build())
    }

    /// Sets the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Describes every request reaching the layer that has no
    /// [`RouteDescriptor`] extension of its own.
    ///
    /// Useful when the layer is attached to a single route.
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.route = Some(route);
        self
    }
}

impl<St: ResponseStore> SmartCacheBuilder<St> {
    /// Finishes the layer.
    pub fn build(self) -> SmartCache<St> {
        SmartCache {
            store: Arc::new(self.store),
            resolver: PolicyResolver::new(Arc::new(self.config)),
            route: self.route,
        }
    }
}
