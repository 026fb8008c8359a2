//! Proxy and system variable resolution
//!
//! Proxy base URLs are resolved most-specific-first: per endpoint
//! (`codeartifact.<domain>-<owner>-<region>.proxy.base-url`), per region
//! (`codeartifact.<region>.proxy.base-url`), then globally
//! (`codeartifact.proxy.base-url`). Each key is looked up as a property first,
//! then as its SCREAMING_SNAKE_CASE environment variable equivalent.

use crate::endpoint::CodeArtifactEndpoint;
use std::collections::HashMap;
use url::Url;

const PROXY_ENABLED_KEY: &str = "codeartifact.proxy.enabled";

/// Resolves dotted configuration keys from explicit properties or the process
/// environment. Blank values count as unset.
#[derive(Debug, Clone, Default)]
pub struct SystemVarResolver {
    properties: HashMap<String, String>,
}

impl SystemVarResolver {
    /// Resolver backed only by the process environment.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Resolver with explicit properties taking precedence over the
    /// environment. Used by the CLI for `-D`-style overrides and by tests.
    pub fn with_properties(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    /// First non-blank value among `keys`, or `None`.
    pub fn resolve(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.resolve_one(key))
    }

    fn resolve_one(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .cloned()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                std::env::var(to_env_var(key))
                    .ok()
                    .filter(|value| !value.trim().is_empty())
            })
    }
}

/// `codeartifact.proxy.base-url` -> `CODEARTIFACT_PROXY_BASE_URL`
fn to_env_var(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Resolves the proxy base URL for an endpoint, if proxying applies.
#[derive(Debug, Clone, Default)]
pub struct ProxyResolver {
    vars: SystemVarResolver,
}

impl ProxyResolver {
    pub fn new(vars: SystemVarResolver) -> Self {
        Self { vars }
    }

    /// The configured proxy base URL for `endpoint`, or `None` when proxying
    /// is disabled or unconfigured. Proxying defaults to enabled.
    pub fn resolve(&self, endpoint: &CodeArtifactEndpoint) -> Option<Url> {
        let enabled = self
            .vars
            .resolve(&[PROXY_ENABLED_KEY])
            .map(|value| value.parse::<bool>().unwrap_or(true))
            .unwrap_or(true);
        if !enabled {
            return None;
        }

        let endpoint_key = format!("codeartifact.{}.proxy.base-url", endpoint.cache_key());
        let region_key = format!("codeartifact.{}.proxy.base-url", endpoint.region);
        self.vars
            .resolve(&[
                endpoint_key.as_str(),
                region_key.as_str(),
                "codeartifact.proxy.base-url",
            ])
            .and_then(|base| Url::parse(&base).ok())
    }
}
