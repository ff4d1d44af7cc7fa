//! JSON:API request transport.
//!
//! A [`Client`] is bound to one normalized [`BaseUrl`] and an optional bearer
//! token. Each call issues exactly one HTTP request under a
//! [`RequestContext`]; there are no retries.
//!
//! Failures are classified so callers can present them differently:
//!
//! - [`ClientError::Status`]: the server answered with a non-2xx status. The
//!   response body is kept for diagnostics.
//! - [`ClientError::Transport`]: DNS, connect, TLS, or read failures. No body.
//! - [`ClientError::Cancelled`] / [`ClientError::DeadlineExceeded`]: the
//!   context ended before the response was fully read.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::base_url::BaseUrl;
use crate::context::{ContextError, RequestContext};
use crate::document::{self, ApiError, DecodeError, Document};
use crate::query::Query;
use crate::store::Secret;

/// Media type for JSON:API requests and responses.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("xbe-cli/", env!("CARGO_PKG_VERSION"));

/// Error type for requests.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server returned a non-2xx status.
    #[error("server returned HTTP {status}")]
    Status { status: u16, body: Vec<u8> },

    /// The request never produced a complete response.
    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The context deadline passed before the response was read.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Base URL and path do not form a valid URL.
    #[error("invalid request URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    Build { message: String },
}

impl ClientError {
    /// HTTP status for status errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body for status errors.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// JSON:API `errors` carried by a status error's body.
    pub fn api_errors(&self) -> Vec<ApiError> {
        self.body().map(document::decode_errors).unwrap_or_default()
    }

    /// Check if the server rejected the credentials (401 or 403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Check if the context ended the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Check if the request failed before a response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    fn transport(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport {
            message,
            timeout: err.is_timeout(),
        }
    }
}

impl From<ContextError> for ClientError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// HTTP methods used against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// The method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Decode the body as a JSON:API document.
    pub fn decode(&self) -> Result<Document, DecodeError> {
        document::decode(&self.body)
    }

    /// Check whether the body is empty, e.g. `204 No Content`.
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }
}

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: BaseUrl,
    token: Option<Secret>,
    timeout: Option<Duration>,
    user_agent: String,
}

impl ClientBuilder {
    /// Bearer token; a blank token sends no `Authorization` header.
    pub fn token(mut self, token: Secret) -> Self {
        self.token = Some(token);
        self
    }

    /// Transport-level timeout, independent of any context deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client. Fails only if the HTTP stack cannot be initialized.
    pub fn build(self) -> Result<Client, ClientError> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ClientError::Build {
            message: e.to_string(),
        })?;

        Ok(Client {
            http,
            base_url: self.base_url,
            token: self.token.filter(|t| !t.is_blank()),
        })
    }
}

/// JSON:API client bound to one base URL and token.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: BaseUrl,
    token: Option<Secret>,
}

impl Client {
    /// Start building a client for `base_url`.
    pub fn builder(base_url: BaseUrl) -> ClientBuilder {
        ClientBuilder {
            base_url,
            token: None,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Create a client with default settings.
    pub fn new(base_url: BaseUrl, token: Option<Secret>) -> Result<Self, ClientError> {
        let builder = Self::builder(base_url);
        match token {
            Some(token) => builder.token(token).build(),
            None => builder.build(),
        }
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Check whether requests carry an `Authorization` header.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// GET `path` with `query`.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &Query,
    ) -> Result<Response, ClientError> {
        self.request(ctx, Method::Get, path, Some(query), None).await
    }

    /// POST a JSON:API body to `path`.
    pub async fn post(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: Vec<u8>,
    ) -> Result<Response, ClientError> {
        self.request(ctx, Method::Post, path, None, Some(body)).await
    }

    /// POST with query parameters, e.g. `include` on a create.
    pub async fn post_with_query(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &Query,
        body: Vec<u8>,
    ) -> Result<Response, ClientError> {
        self.request(ctx, Method::Post, path, Some(query), Some(body))
            .await
    }

    /// PATCH a JSON:API body to `path`.
    pub async fn patch(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: Vec<u8>,
    ) -> Result<Response, ClientError> {
        self.request(ctx, Method::Patch, path, None, Some(body)).await
    }

    /// DELETE `path`. A `204` yields an empty [`Response`].
    pub async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<Response, ClientError> {
        self.request(ctx, Method::Delete, path, None, None).await
    }

    /// Issue one request.
    ///
    /// The send and the full body read run under `ctx`; cancellation or
    /// deadline expiry drops the in-flight request.
    pub async fn request(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        query: Option<&Query>,
        body: Option<Vec<u8>>,
    ) -> Result<Response, ClientError> {
        let url = self.url(path, query)?;
        debug!(%method, %url, "sending request");

        let mut request = self
            .http
            .request(method.into(), url)
            .header(ACCEPT, JSONAPI_MEDIA_TYPE);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, JSONAPI_MEDIA_TYPE).body(body);
        }

        let (status, bytes) = ctx
            .run(async move {
                let response = request.send().await?;
                let status = response.status();
                let bytes = response.bytes().await?;
                Ok::<_, reqwest::Error>((status, bytes))
            })
            .await?
            .map_err(ClientError::transport)?;

        debug!(status = status.as_u16(), bytes = bytes.len(), "response received");

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: bytes.to_vec(),
            });
        }

        Ok(Response {
            status: status.as_u16(),
            body: bytes.to_vec(),
        })
    }

    fn url(&self, path: &str, query: Option<&Query>) -> Result<Url, ClientError> {
        let raw = self.base_url.join(path);
        let mut url = Url::parse(&raw).map_err(|source| ClientError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.iter() {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}
