//! Error types for nutriscan-scanner
//!
//! Catalog errors never reach the presentation layer directly: lookups are
//! folded into a [`crate::models::LookupResult`], submissions surface as a
//! notice.

use thiserror::Error;

/// Catalog service client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Service answered 404
    #[error("Product not found: {}", .detail.as_deref().unwrap_or("no detail"))]
    NotFound { detail: Option<String> },

    /// Service answered with any other non-success status
    #[error("API error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    /// Connection, timeout or body transfer failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not the expected JSON shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Base URL could not be combined with the request path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Submission rejected before any network call
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Service-supplied detail, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            CatalogError::NotFound { detail } | CatalogError::Api { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// The flow controller task has ended (screen left)
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Scan flow has ended")]
pub struct FlowClosed;
