//! Process-wide engine configuration.
//!
//! [`EngineConfig`] is built once at startup, either with
//! [`EngineConfig::builder`] or by deserializing it from a configuration file,
//! and is shared read-only afterwards.
//!
//! ```
//! use smartcache_core::EngineConfig;
//!
//! let yaml = r#"
//! enabled_by_default: false
//! default_ttl: 30s
//! content_types: [application/json]
//! excluded_methods: [DELETE]
//! "#;
//! let config: EngineConfig = serde_saphyr::from_str(yaml).unwrap();
//! assert!(!config.enabled_by_default);
//! assert_eq!(config.default_ttl.as_secs(), 30);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Content type prefixes cached when none are configured.
pub const DEFAULT_CONTENT_TYPES: [&str; 3] = ["application/json", "application/xml", "text/plain"];

fn default_enabled() -> bool {
    true
}

fn default_ttl() -> Duration {
    Duration::from_secs(5)
}

fn default_include_headers() -> bool {
    true
}

/// Global caching settings.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct EngineConfig {
    /// Whether routes are cached unless they opt out.
    #[serde(default = "default_enabled")]
    pub enabled_by_default: bool,
    /// TTL for routes without an explicit one (e.g., "5s", "500ms", "1m").
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Cacheable content type prefixes, matched case-insensitively in order.
    /// Empty means [`DEFAULT_CONTENT_TYPES`].
    #[serde(default)]
    pub content_types: Vec<String>,
    /// Request headers left out of the cache key (case-insensitive).
    #[serde(default)]
    pub excluded_headers: Vec<String>,
    /// HTTP methods never cached (case-insensitive).
    #[serde(default)]
    pub excluded_methods: Vec<String>,
    /// Whether query strings (and folded headers) keep their case in the key.
    #[serde(default)]
    pub query_case_sensitive: bool,
    /// Whether request headers are folded into the key at all.
    #[serde(default = "default_include_headers")]
    pub include_headers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: default_enabled(),
            default_ttl: default_ttl(),
            content_types: Vec::new(),
            excluded_headers: Vec::new(),
            excluded_methods: Vec::new(),
            query_case_sensitive: false,
            include_headers: default_include_headers(),
        }
    }
}

impl EngineConfig {
    /// Creates a new [`EngineConfigBuilder`] starting from the defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Whether `name` is listed in `excluded_headers`.
    pub fn is_excluded_header(&self, name: &str) -> bool {
        self.excluded_headers
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }

    /// Whether `method` is listed in `excluded_methods`.
    pub fn is_excluded_method(&self, method: &str) -> bool {
        self.excluded_methods
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(method))
    }

    /// Configured content type prefixes, falling back to [`DEFAULT_CONTENT_TYPES`].
    pub fn content_type_prefixes(&self) -> impl Iterator<Item = &str> {
        let configured = self.content_types.iter().map(String::as_str);
        let defaults = DEFAULT_CONTENT_TYPES
            .iter()
            .copied()
            .filter(|_| self.content_types.is_empty());
        configured.chain(defaults)
    }
}

/// Fluent builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets whether routes are cached unless they opt out.
    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.config.enabled_by_default = enabled;
        self
    }

    /// Sets the TTL used when a route has none.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Appends a cacheable content type prefix.
    pub fn content_type(mut self, prefix: impl Into<String>) -> Self {
        self.config.content_types.push(prefix.into());
        self
    }

    /// Leaves a request header out of the cache key.
    pub fn exclude_header(mut self, name: impl Into<String>) -> Self {
        self.config.excluded_headers.push(name.into());
        self
    }

    /// Never caches requests with this method.
    pub fn exclude_method(mut self, method: impl Into<String>) -> Self {
        self.config.excluded_methods.push(method.into());
        self
    }

    /// Sets the default query case sensitivity.
    pub fn query_case_sensitive(mut self, sensitive: bool) -> Self {
        self.config.query_case_sensitive = sensitive;
        self
    }

    /// Sets whether request headers are folded into the key.
    pub fn include_headers(mut self, include: bool) -> Self {
        self.config.include_headers = include;
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
