//! Repository metadata lookup for project cards.
//!
//! [`Decorator::resolve`] turns a repository identifier into the text shown in
//! a card's description element:
//!
//! 1. fresh cache entry → use it, no request;
//! 2. otherwise `GET {apiBase}/repos/{owner}/{name}` (JSON, no HTTP cache);
//! 3. non-success status, transport or decode failure → leave the card alone;
//! 4. success → trimmed `description` (or the placeholder), written through to
//!    the cache.
//!
//! Cache failures never surface: a failed read is a miss, a failed write is
//! logged and dropped. Cards sharing a repository each issue their own request
//! when their entry is stale; identical in-flight requests are not coalesced.

use core::fmt;
use core::future::Future;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheLookup, KeyValueStore, MetadataCache};
use crate::clock::Clock;
use crate::config::SiteConfig;

/// Media type requested from the repository API.
pub const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

/// Metadata lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("invalid repository identifier `{0}`")]
    InvalidRepo(String),
    #[error("metadata request failed: {0}")]
    Transport(String),
    #[error("metadata request returned HTTP {0}")]
    Status(u16),
    #[error("malformed metadata response: {0}")]
    Malformed(String),
}

/// A validated `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Parse `owner/name`. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, MetadataError> {
        let trimmed = raw.trim();
        let invalid = || MetadataError::InvalidRepo(raw.to_owned());
        let (owner, name) = trimmed.split_once('/').ok_or_else(invalid)?;
        let valid_part = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };
        if !valid_part(owner) || !valid_part(name) {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// An outbound metadata request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    pub url: String,
    pub accept: &'static str,
    /// Bypass any HTTP-level cache.
    pub no_store: bool,
}

impl MetadataRequest {
    #[must_use]
    pub fn for_repo(api_base: &str, repo: &RepoId) -> Self {
        Self {
            url: format!("{}/repos/{}", api_base.trim_end_matches('/'), repo),
            accept: ACCEPT_GITHUB_JSON,
            no_store: true,
        }
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends metadata requests. Implemented over `fetch` in the browser.
pub trait MetadataTransport {
    fn send(
        &self,
        request: &MetadataRequest,
    ) -> impl Future<Output = Result<HttpResponse, MetadataError>>;
}

#[derive(Deserialize)]
struct RepoMetadata {
    #[serde(default)]
    description: Option<String>,
}

/// Extract the card text from a metadata response.
///
/// The description is trimmed; an absent, null or blank description becomes
/// `placeholder`.
pub fn interpret_response(
    response: &HttpResponse,
    placeholder: &str,
) -> Result<String, MetadataError> {
    if !response.is_success() {
        return Err(MetadataError::Status(response.status));
    }
    let meta: RepoMetadata = serde_json::from_str(&response.body)
        .map_err(|e| MetadataError::Malformed(e.to_string()))?;
    let description = meta
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(placeholder);
    Ok(description.to_owned())
}

/// What to do with a card's description element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A fresh cached description.
    Cached(String),
    /// A description fetched just now.
    Fetched(String),
    /// Leave the card's current text untouched.
    Unchanged,
}

impl Resolution {
    /// The text to write, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Cached(d) | Self::Fetched(d) => Some(d),
            Self::Unchanged => None,
        }
    }
}

/// Resolves card descriptions through the cache and the remote API.
pub struct Decorator<S, T, C> {
    cache: MetadataCache<S>,
    transport: T,
    clock: C,
    api_base: String,
    placeholder: String,
}

impl<S, T, C> Decorator<S, T, C>
where
    S: KeyValueStore,
    T: MetadataTransport,
    C: Clock,
{
    #[must_use]
    pub fn new(config: &SiteConfig, store: S, transport: T, clock: C) -> Self {
        Self {
            cache: MetadataCache::new(store, config.cache_prefix.clone(), config.cache_ttl_ms),
            transport,
            clock,
            api_base: config.api_base.clone(),
            placeholder: config.placeholder_description.clone(),
        }
    }

    /// Fresh cached description for `repo`, if any. Cache failures are misses.
    #[must_use]
    pub fn cached(&self, repo: &RepoId) -> Option<String> {
        match self.cache.lookup(repo, self.clock.now_epoch_ms()) {
            Ok(CacheLookup::Hit(description)) => Some(description),
            Ok(CacheLookup::Miss) => None,
            Err(err) => {
                debug!(
                    repo = %repo,
                    store = self.cache.backend().name(),
                    error = %err,
                    "metadata cache read failed, treating as miss"
                );
                None
            }
        }
    }

    /// Resolve the description for one card.
    pub async fn resolve(&self, repo: &RepoId) -> Resolution {
        if let Some(description) = self.cached(repo) {
            return Resolution::Cached(description);
        }

        let request = MetadataRequest::for_repo(&self.api_base, repo);
        let outcome = match self.transport.send(&request).await {
            Ok(response) => interpret_response(&response, &self.placeholder),
            Err(err) => Err(err),
        };
        let description = match outcome {
            Ok(description) => description,
            Err(err) => {
                warn!(repo = %repo, error = %err, "repository metadata unavailable");
                return Resolution::Unchanged;
            }
        };

        if let Err(err) = self
            .cache
            .store(repo, &description, self.clock.now_epoch_ms())
        {
            debug!(
                repo = %repo,
                store = self.cache.backend().name(),
                error = %err,
                "metadata cache write failed"
            );
        }
        Resolution::Fetched(description)
    }
}

impl<S, T, C> fmt::Debug for Decorator<S, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("api_base", &self.api_base)
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}
