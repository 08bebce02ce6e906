//! Upstream feed of external deposit events.

use crate::domain::DepositEvent;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod http;
pub mod mock;

pub use http::HttpDepositSource;
pub use mock::MockDepositSource;

/// Source of confirmed deposits that have not been placed yet.
///
/// Implementations may return events that were already processed; the
/// engine deduplicates on `event_key`.
#[async_trait]
pub trait DepositSource: Send + Sync + fmt::Debug {
    /// Fetch pending deposit events in the order they should be applied.
    async fn fetch_pending_deposits(&self) -> Result<Vec<DepositEvent>, DepositSourceError>;
}

/// Error type for deposit source operations.
#[derive(Debug, Clone, Error)]
pub enum DepositSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    #[error("Network error: {0}")]
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Rate limited")]
    RateLimited,
}
