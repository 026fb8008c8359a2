//! CodeArtifact endpoint identity
//!
//! Parses repository URLs of the form
//! `https://<domain>-<owner>.d.codeartifact.<region>.amazonaws.com/<type>/<repository>`
//! into a structured identity. The same repository may be addressed with the
//! custom `codeartifact://` scheme; both forms parse to the identical identity
//! and share one cache key. Parsing is a pure string operation with no I/O.

use crate::error::{FetchError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// URL scheme used to route requests through the authenticated fetch path
pub const CODEARTIFACT_SCHEME: &str = "codeartifact";

// Hostname grammar is fixed to the AWS CodeArtifact form. The owner segment is
// a numeric AWS account id; anything non-numeric must fail the match.
static ENDPOINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https|codeartifact)://(?P<domain>.*?)-(?P<domainOwner>[0-9]+)\.d\.codeartifact\.(?P<region>.+?)\.amazonaws\.com(?::[0-9]+)?/(?P<type>[^/?]+)/(?P<repository>.+?)/?(?:\?.*)?$",
    )
    .expect("endpoint regex is valid")
});

/// Structured identity of one CodeArtifact repository, derived from its URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeArtifactEndpoint {
    pub domain: String,
    /// Numeric AWS account id owning the domain
    pub domain_owner: String,
    pub region: String,
    pub repository: String,
    /// Registry format, e.g. "maven", "npm" or "generic"
    #[serde(rename = "type")]
    pub package_type: String,
    /// The URL this identity was parsed from, scheme included
    pub url: Url,
}

impl CodeArtifactEndpoint {
    /// Parse a repository URL. Returns `None` when the URL does not fit the
    /// CodeArtifact grammar so callers can skip foreign repositories cleanly.
    pub fn parse(url: &str) -> Option<Self> {
        let captures = ENDPOINT_REGEX.captures(url)?;
        let parsed = Url::parse(url).ok()?;
        Some(Self {
            domain: captures["domain"].to_string(),
            domain_owner: captures["domainOwner"].to_string(),
            region: captures["region"].to_string(),
            repository: captures["repository"].to_string(),
            package_type: captures["type"].to_string(),
            url: parsed,
        })
    }

    /// Parse a repository URL, raising a configuration error on non-match.
    pub fn require(url: &str) -> Result<Self> {
        Self::parse(url).ok_or_else(|| FetchError::InvalidEndpoint(url.to_string()))
    }

    /// Stable identity across scheme variants and URL formatting noise.
    pub fn cache_key(&self) -> String {
        format!("{}-{}-{}", self.domain, self.domain_owner, self.region)
    }

    /// Pascal-cased `domain-repository`, used for display purposes.
    pub fn display_name(&self) -> String {
        to_pascal_case(&format!("{}-{}", self.domain, self.repository))
    }

    pub fn is_codeartifact_scheme(&self) -> bool {
        self.url.scheme() == CODEARTIFACT_SCHEME
    }

    /// The endpoint URL with the canonical `https` scheme.
    pub fn to_https_url(&self) -> Url {
        substitute_scheme(&self.url, "https")
    }

    /// The endpoint URL with the custom `codeartifact` scheme.
    pub fn to_codeartifact_url(&self) -> Url {
        substitute_scheme(&self.url, CODEARTIFACT_SCHEME)
    }
}

/// Swap the URL scheme, preserving every other component.
fn substitute_scheme(url: &Url, scheme: &str) -> Url {
    if url.scheme() == scheme {
        return url.clone();
    }
    let rest = url
        .as_str()
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url.as_str());
    Url::parse(&format!("{}://{}", scheme, rest)).expect("scheme substitution keeps URL valid")
}

fn to_pascal_case(input: &str) -> String {
    input
        .split(['-', '_'])
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
