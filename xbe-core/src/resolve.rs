//! Token resolution.
//!
//! The token for a request comes from the first source that has one:
//!
//! 1. an explicit value (the `--token` flag)
//! 2. the `XBE_TOKEN` environment variable, then `XBE_API_TOKEN`
//! 3. the [`CredentialStore`] entry for the normalized base URL
//!
//! Absence of a token is reported as [`ResolveError::NotFound`]; whether that
//! is fatal is the caller's decision. Resolution never writes to the store and
//! performs at most one store lookup.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::base_url::BaseUrl;
use crate::context::{ContextError, RequestContext};
use crate::store::{BackendKind, CredentialStore, Secret, StoreError};

/// Environment variables checked for a token, in priority order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["XBE_TOKEN", "XBE_API_TOKEN"];

/// Error type for token resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No source produced a token.
    #[error("no token found for {base_url}")]
    NotFound { base_url: String },

    /// The credential store failed (both backends).
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    /// The context was cancelled or expired during the store lookup.
    #[error("token lookup interrupted: {0}")]
    Context(#[from] ContextError),
}

impl ResolveError {
    /// Check if resolution simply found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Where a resolved token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Passed explicitly by the caller.
    Flag,
    /// Read from the named environment variable.
    Env(&'static str),
    /// Read from a credential store backend.
    Store(BackendKind),
}

impl TokenSource {
    /// Human-readable source label: `flag`, the variable name, `keychain` or `file`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env(name) => name,
            Self::Store(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A token together with the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    /// The bearer token.
    pub token: Secret,
    /// Where it came from.
    pub source: TokenSource,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Applies the flag → environment → store priority chain.
pub struct TokenResolver<'a> {
    store: Option<&'a CredentialStore>,
    env: EnvLookup,
}

impl<'a> TokenResolver<'a> {
    /// Create a resolver that reads the process environment and `store`.
    pub fn new(store: &'a CredentialStore) -> Self {
        Self {
            store: Some(store),
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Create a resolver with no store; only flag and environment are consulted.
    pub fn without_store() -> Self {
        Self {
            store: None,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Resolve the token for `base_url`.
    ///
    /// Blank values at any level are treated as absent.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        base_url: &BaseUrl,
        explicit: Option<&str>,
    ) -> Result<ResolvedToken, ResolveError> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(ResolvedToken {
                token: Secret::new(token),
                source: TokenSource::Flag,
            });
        }

        for name in TOKEN_ENV_VARS {
            if let Some(token) = (self.env)(name).filter(|t| !t.trim().is_empty()) {
                debug!("token resolved from environment variable {}", name);
                return Ok(ResolvedToken {
                    token: Secret::new(token.trim()),
                    source: TokenSource::Env(name),
                });
            }
        }

        let Some(store) = self.store else {
            return Err(ResolveError::NotFound {
                base_url: base_url.to_string(),
            });
        };

        match ctx.run(store.get(base_url)).await? {
            Ok(stored) => Ok(ResolvedToken {
                token: stored.token,
                source: TokenSource::Store(stored.backend),
            }),
            Err(StoreError::NotFound { .. }) => Err(ResolveError::NotFound {
                base_url: base_url.to_string(),
            }),
            Err(e) => Err(ResolveError::Store(e)),
        }
    }
}

impl fmt::Debug for TokenResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResolver")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn memory_store() -> CredentialStore {
        CredentialStore::file_only(MemoryBackend::new().with_kind(BackendKind::File))
    }

    #[tokio::test]
    async fn test_flag_wins() {
        let store = memory_store();
        let url = BaseUrl::normalize("staging");
        store.set(&url, &Secret::new("stored")).await.unwrap();

        let resolver = TokenResolver::new(&store).with_env(env_of(&[("XBE_TOKEN", "env")]));
        let resolved = resolver
            .resolve(&RequestContext::background(), &url, Some("flag-token"))
            .await
            .unwrap();

        assert_eq!(resolved.token.expose(), "flag-token");
        assert_eq!(resolved.source, TokenSource::Flag);
        assert_eq!(resolved.source.label(), "flag");
    }

    #[tokio::test]
    async fn test_env_order() {
        let resolver = TokenResolver::without_store().with_env(env_of(&[
            ("XBE_TOKEN", "primary"),
            ("XBE_API_TOKEN", "secondary"),
        ]));
        let url = BaseUrl::default_root();

        let resolved = resolver
            .resolve(&RequestContext::background(), &url, None)
            .await
            .unwrap();
        assert_eq!(resolved.token.expose(), "primary");
        assert_eq!(resolved.source.label(), "XBE_TOKEN");

        let resolver = TokenResolver::without_store()
            .with_env(env_of(&[("XBE_API_TOKEN", "secondary")]));
        let resolved = resolver
            .resolve(&RequestContext::background(), &url, None)
            .await
            .unwrap();
        assert_eq!(resolved.token.expose(), "secondary");
        assert_eq!(resolved.source, TokenSource::Env("XBE_API_TOKEN"));
    }

    #[tokio::test]
    async fn test_blank_values_are_skipped() {
        let resolver = TokenResolver::without_store()
            .with_env(env_of(&[("XBE_TOKEN", "  "), ("XBE_API_TOKEN", "real")]));
        let resolved = resolver
            .resolve(&RequestContext::background(), &BaseUrl::default_root(), Some(""))
            .await
            .unwrap();
        assert_eq!(resolved.token.expose(), "real");
    }

    #[tokio::test]
    async fn test_store_fallback_reports_backend() {
        let store = memory_store();
        let url = BaseUrl::normalize("staging");
        store.set(&url, &Secret::new("stored")).await.unwrap();

        let resolver = TokenResolver::new(&store).with_env(env_of(&[]));
        let resolved = resolver
            .resolve(&RequestContext::background(), &url, None)
            .await
            .unwrap();
        assert_eq!(resolved.token.expose(), "stored");
        assert_eq!(resolved.source.label(), "file");
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let store = memory_store();
        let resolver = TokenResolver::new(&store).with_env(env_of(&[]));
        let err = resolver
            .resolve(&RequestContext::background(), &BaseUrl::default_root(), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_store() {
        let store = memory_store();
        let url = BaseUrl::default_root();
        store.set(&url, &Secret::new("stored")).await.unwrap();

        let (ctx, canceller) = RequestContext::background().cancellable();
        canceller.cancel();

        let resolver = TokenResolver::new(&store).with_env(env_of(&[]));
        let err = resolver.resolve(&ctx, &url, None).await.unwrap_err();
        assert!(matches!(err, ResolveError::Context(ContextError::Cancelled)));
    }
}
