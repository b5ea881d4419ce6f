use std::time::Duration;

use thiserror::Error;

use crate::data_models::Platform;
use crate::money::Money;

/// Errors surfaced to the caller of a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    Validation(#[from] ValidationError),

    #[error("configuration error for {platform}: {message}")]
    Configuration { platform: Platform, message: String },
}

/// Reasons a `ProductQuery` is rejected before any dispatch happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("search term must not be empty")]
    EmptyTerm,

    #[error("max results must be greater than zero")]
    ZeroMaxResults,

    #[error("max results {requested} exceeds the limit of {limit}")]
    TooManyResults { requested: usize, limit: usize },

    #[error("at least one platform must be requested")]
    NoPlatforms,

    #[error("price bound {0} is negative")]
    NegativePrice(Money),

    #[error("min price {min} is greater than max price {max}")]
    InvertedPriceBounds { min: Money, max: Money },
}

/// Failure of a single platform adapter call. Never escapes the coordinator.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response exceeded {limit} bytes")]
    ResponseTooLarge { limit: usize },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("provider reported an error: {0}")]
    Provider(String),

    #[error("request signing failed: {0}")]
    Signing(#[from] SigningError),
}

impl AdapterError {
    /// True for failures that happened before a response body could be read.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AdapterError::Timeout(_)
                | AdapterError::Transport(_)
                | AdapterError::Status { .. }
                | AdapterError::ResponseTooLarge { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("missing signing input: {0}")]
    MissingField(&'static str),

    #[error("invalid HMAC key")]
    InvalidKey,
}
