//! Backend implementations of the storefront services.
//!
//! # Architecture
//!
//! - The document store is the source of truth - NO local sync
//! - [`RestBackend`] talks REST/JSON to the document-store gateway and caches
//!   product reads in memory via `moka` (5 minute TTL by default)
//! - [`MemoryBackend`] keeps everything in-process, for tests, demos and
//!   offline use
//!
//! Both implement every service trait in [`crate::services`], so an
//! [`AppState`](crate::state::AppState) can be assembled from either.
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::backend::RestBackend;
//!
//! let backend = RestBackend::new(&config.backend)?;
//! let product = backend.get_product(&ProductId::new("abc")).await?;
//! ```

pub mod memory;
mod rest;

use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorKind;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Errors that can occur when talking to a remote store.
///
/// Every service call surfaces failures as this type so that transport
/// details never leak past the service seam.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A document was readable but violated a record invariant.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Referenced document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the store.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The call did not complete within the configured bound.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The store is unreachable or refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Whether the error means the referenced document is missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Classify for callers: a missing document is `NotFound`, everything
    /// else is a `Remote` failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        if self.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Remote
        }
    }
}

/// Truncate a response body for logs and error messages.
fn excerpt(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
