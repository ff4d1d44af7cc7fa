//! Top-level error type for the xbe core.

use thiserror::Error;

use crate::client::ClientError;
use crate::context::ContextError;
use crate::document::DecodeError;
use crate::resolve::ResolveError;
use crate::store::StoreError;

/// Any error the core can return.
#[derive(Debug, Error)]
pub enum XbeError {
    /// Credential store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Token resolution failed.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Request failed.
    #[error("request error: {0}")]
    Client(#[from] ClientError),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Context(#[from] ContextError),
}

impl XbeError {
    /// Check whether the user needs to log in: no token was found, or the
    /// server rejected the one that was sent.
    pub fn is_auth_required(&self) -> bool {
        match self {
            Self::Resolve(e) => e.is_not_found(),
            Self::Client(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Check whether the operation was cancelled or ran out of time.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Context(_) => true,
            Self::Resolve(ResolveError::Context(_)) => true,
            Self::Client(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
