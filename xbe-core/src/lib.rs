//! # xbe core
//!
//! Credential resolution and JSON:API transport for the `xbe` command-line
//! client.
//!
//! This crate provides:
//! - Base URL normalization with environment shorthands
//! - A credential store backed by the OS keychain with a private JSON file fallback
//! - Token resolution from flag, environment, then store
//! - A cancellable request context and a JSON:API HTTP client
//! - A document decoder with tolerant relationship and attribute accessors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xbe_core::{BaseUrl, Client, CredentialStore, Query, RequestContext, TokenResolver};
//!
//! async fn list_widgets() -> Result<(), xbe_core::XbeError> {
//!     let base_url = BaseUrl::normalize("staging");
//!     let store = CredentialStore::open_default()?;
//!     let ctx = RequestContext::background();
//!
//!     let resolved = TokenResolver::new(&store).resolve(&ctx, &base_url, None).await?;
//!     let client = Client::new(base_url, Some(resolved.token))?;
//!
//!     let response = client.get(&ctx, "/v1/widgets", &Query::new().page_limit(10)).await?;
//!     for widget in response.decode()?.resources() {
//!         println!("{} {}", widget.id, xbe_core::attrs::string_attr(&widget.attributes, "name"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod base_url;
pub mod client;
pub mod context;
pub mod document;
pub mod error;
pub mod query;
pub mod resolve;
pub mod store;

// Re-export commonly used types at crate root
pub use base_url::{BaseUrl, DEFAULT_BASE_URL};

pub use client::{Client, ClientBuilder, ClientError, Method, Response};

pub use context::{Canceller, ContextError, RequestContext};

pub use document::{
    ApiError, Attributes, DecodeError, Document, IncludedIndex, PrimaryData, Relationship,
    Resource, ResourceIdentifier, ResourceObject, attrs, decode, decode_errors,
};

pub use error::XbeError;

pub use query::{Query, SortKey, SparseFieldOverrides};

pub use resolve::{ResolveError, ResolvedToken, TokenResolver, TokenSource};

pub use store::{
    BackendKind, CredentialBackend, CredentialStore, FileBackend, MemoryBackend, Secret,
    StoreError, StoredCredential,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringBackend;
