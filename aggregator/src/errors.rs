use crate::config::ValidationError;
use serde_json::Value as JsonValue;
use shared::http::TransportError;
use thiserror::Error;
use url::Url;

/// Result type alias for aggregator operations
pub type Result<T, E = FetchError> = std::result::Result<T, E>;

/// Errors that can occur while fetching and validating upstream data
#[derive(Error, Debug)]
pub enum FetchError {
    /// Status, content type or body decoding failed before the payload could
    /// be inspected.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("data returned {value} from {url} is not of type map")]
    UnexpectedShape { url: Url, value: JsonValue },

    #[error("data returned {value} from {url} is missing key {key}")]
    MissingField {
        url: Url,
        key: &'static str,
        value: JsonValue,
    },

    #[error("value {value} for key {key} returned from {url} is not of type {expected}")]
    TypeMismatch {
        url: Url,
        key: String,
        expected: &'static str,
        value: JsonValue,
    },
}

/// Errors building an [`Aggregator`](crate::Aggregator) from configuration
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("invalid config: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
