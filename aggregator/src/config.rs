use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upstream the aggregator talks to when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://vautointerview.azurewebsites.net";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Base URL must use http or https: {0}")]
    UnsupportedScheme(String),

    #[error("Base URL cannot be used as a base for endpoint paths: {0}")]
    InvalidBaseUrl(String),

    #[error("max_concurrency cannot be 0")]
    ZeroConcurrency,

    #[error("http_timeout_secs cannot be 0")]
    ZeroTimeout,
}

/// Aggregator configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub upstream: Upstream,
    #[serde(default)]
    pub fan_out: FanOutConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.upstream.validate()?;
        self.fan_out.validate()?;
        Ok(())
    }
}

/// Upstream API location
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Upstream {
    /// Base URL; endpoint paths are appended to its path.
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Per-request timeout covering the whole request/response cycle.
    ///
    /// Unset means requests wait indefinitely, and a single hung request
    /// stalls its collection stage.
    pub http_timeout_secs: Option<u64>,
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

impl Default for Upstream {
    fn default() -> Self {
        Upstream {
            base_url: default_base_url(),
            http_timeout_secs: None,
        }
    }
}

impl Upstream {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(self.base_url.to_string()));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(ValidationError::InvalidBaseUrl(self.base_url.to_string()));
        }
        if self.http_timeout_secs == Some(0) {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

/// Concurrency of the collection stages
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct FanOutConfig {
    /// Upper bound on in-flight per-entity requests. Unset means one
    /// concurrent request per id, however many ids there are.
    pub max_concurrency: Option<usize>,
}

impl FanOutConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrency == Some(0) {
            return Err(ValidationError::ZeroConcurrency);
        }
        Ok(())
    }

    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.max_concurrency.and_then(NonZeroUsize::new)
    }
}
