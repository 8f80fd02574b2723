//! Cacheability policy: global defaults, per-route overrides and opt-outs.
//!
//! The decision is layered:
//!
//! 1. baseline is [`EngineConfig::enabled_by_default`]
//! 2. a disabled baseline is lifted by [`RoutePolicy::force_enabled`]
//! 3. [`RoutePolicy::force_disabled`] always wins
//! 4. an eligible request must use a method the route declares, and that
//!    method must not be globally excluded
//!
//! Content-type gating happens later, once the response exists; see
//! [`PolicyResolver::is_cacheable_content_type`].

use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{EngineConfig, PolicyError};

/// Per-route caching annotations, attached once at route registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct RoutePolicy {
    /// Opt in even when caching is globally disabled.
    #[serde(default)]
    pub force_enabled: bool,
    /// Opt out unconditionally.
    #[serde(default)]
    pub force_disabled: bool,
    /// TTL overriding [`EngineConfig::default_ttl`].
    #[serde(default, with = "humantime_serde")]
    pub ttl: Option<Duration>,
    /// Query case sensitivity overriding the global default.
    #[serde(default)]
    pub case_sensitive_query: bool,
}

impl RoutePolicy {
    /// Marks the route as cacheable regardless of the global default.
    pub fn force_enabled(mut self) -> Self {
        self.force_enabled = true;
        self
    }

    /// Marks the route as never cacheable.
    pub fn force_disabled(mut self) -> Self {
        self.force_disabled = true;
        self
    }

    /// Sets an explicit TTL for the route.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Keeps query string case in the cache key.
    pub fn case_sensitive_query(mut self) -> Self {
        self.case_sensitive_query = true;
        self
    }
}

/// Route metadata the router hands to the engine with each request.
///
/// Stored in the request's `http::Extensions`. A request without one is
/// treated as "no route matched" and passes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    methods: Arc<[Method]>,
    policy: RoutePolicy,
}

impl RouteDescriptor {
    /// Describes a route serving `methods` with the given policy.
    pub fn new(methods: impl IntoIterator<Item = Method>, policy: RoutePolicy) -> Self {
        RouteDescriptor {
            methods: methods.into_iter().collect(),
            policy,
        }
    }

    /// Methods the route was registered for.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Caching annotations of the route.
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Whether the route was registered for `method`.
    pub fn supports(&self, method: &Method) -> bool {
        self.methods
            .iter()
            .any(|supported| supported.as_str().eq_ignore_ascii_case(method.as_str()))
    }
}

/// Route policy as written in configuration files.
///
/// ```
/// use smartcache_core::{RouteConfig, RouteDescriptor};
///
/// let yaml = r#"
/// methods: [GET, HEAD]
/// force_enabled: true
/// ttl: 10s
/// "#;
/// let config: RouteConfig = serde_saphyr::from_str(yaml).unwrap();
/// let route = RouteDescriptor::try_from(config).unwrap();
/// assert_eq!(route.methods().len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct RouteConfig {
    /// HTTP method names the route serves.
    pub methods: Vec<String>,
    /// Caching annotations.
    #[serde(flatten)]
    pub policy: RoutePolicy,
}

impl TryFrom<RouteConfig> for RouteDescriptor {
    type Error = PolicyError;

    fn try_from(config: RouteConfig) -> Result<Self, Self::Error> {
        if config.methods.is_empty() {
            return Err(PolicyError::NoMethods);
        }
        let methods = config
            .methods
            .iter()
            .map(|name| {
                Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                    .map_err(|_| PolicyError::InvalidMethod(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteDescriptor::new(methods, config.policy))
    }
}

/// Applies [`EngineConfig`] and route annotations to individual requests.
///
/// Cheap to clone; the configuration is shared.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    config: Arc<EngineConfig>,
}

impl PolicyResolver {
    /// Creates a resolver over a shared configuration.
    pub fn new(config: Arc<EngineConfig>) -> Self {
        PolicyResolver { config }
    }

    /// The configuration this resolver applies.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a request with `method` to `route` is eligible for caching.
    pub fn should_cache(&self, route: &RouteDescriptor, method: &Method) -> bool {
        let policy = route.policy();
        let mut eligible = self.config.enabled_by_default || policy.force_enabled;
        if policy.force_disabled {
            eligible = false;
        }
        let cacheable =
            eligible && route.supports(method) && !self.config.is_excluded_method(method.as_str());
        trace!(
            method = %method,
            force_enabled = policy.force_enabled,
            force_disabled = policy.force_disabled,
            cacheable,
            "route policy resolved"
        );
        cacheable
    }

    /// TTL for entries produced by `route`.
    pub fn resolve_ttl(&self, route: &RoutePolicy) -> Duration {
        route.ttl.unwrap_or(self.config.default_ttl)
    }

    /// Whether the query string keeps its case in the key.
    pub fn query_case_sensitive(&self, route: &RoutePolicy) -> bool {
        route.case_sensitive_query || self.config.query_case_sensitive
    }

    /// Only 2xx responses are stored.
    pub fn is_cacheable_status(&self, status: StatusCode) -> bool {
        status.is_success()
    }

    /// Whether a response with `content_type` may be stored.
    ///
    /// An empty content type never matches.
    pub fn is_cacheable_content_type(&self, content_type: &str) -> bool {
        self.config.content_type_prefixes().any(|prefix| {
            content_type
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}
