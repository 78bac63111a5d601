//! JSON-over-HTTP transport used to reach the upstream API.
//!
//! The [`Transport`] trait is the raw "send a GET/POST, get back status,
//! content type and body" primitive. [`check_response`] is the validation
//! gate every caller goes through: it enforces the status code and content
//! type contracts before decoding the body as JSON.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("request to {url} failed: {message}")]
    RequestFailed { url: Url, message: String },

    #[error("got unexpected status code {status} from url {url}")]
    UnexpectedStatus { url: Url, status: u16 },

    #[error("expected content type application/json from url {url} but got {content_type}")]
    UnexpectedContentType { url: Url, content_type: String },

    #[error("malformed JSON body from url {url}: {source}")]
    MalformedBody {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize request body for {url}: {source}")]
    Serialization {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

/// A response as returned by the transport, before any validation.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    /// Convenience constructor for a 200 response carrying a JSON body.
    pub fn json(body: &JsonValue) -> Self {
        RawResponse {
            status: StatusCode::OK,
            content_type: Some(JSON_MEDIA_TYPE.to_string()),
            body: Bytes::from(body.to_string()),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError>;

    /// POST `body` with a JSON content type.
    async fn post(&self, url: &Url, body: Bytes) -> Result<RawResponse, TransportError>;
}

/// Validates a raw response and decodes its body.
///
/// The status must be exactly 200. The content type only has to *contain*
/// `application/json`, since the upstream appends parameters such as
/// `; charset=utf-8` to the media type.
pub fn check_response(url: &Url, response: RawResponse) -> Result<JsonValue, TransportError> {
    if response.status != StatusCode::OK {
        return Err(TransportError::UnexpectedStatus {
            url: url.clone(),
            status: response.status.as_u16(),
        });
    }

    match response.content_type.as_deref() {
        Some(content_type) if content_type.contains(JSON_MEDIA_TYPE) => {}
        other => {
            return Err(TransportError::UnexpectedContentType {
                url: url.clone(),
                content_type: other.unwrap_or("<none>").to_string(),
            });
        }
    }

    serde_json::from_slice(&response.body).map_err(|source| TransportError::MalformedBody {
        url: url.clone(),
        source,
    })
}

/// GET `url` and return the validated JSON body.
pub async fn get_json(transport: &dyn Transport, url: &Url) -> Result<JsonValue, TransportError> {
    let response = transport.get(url).await?;
    check_response(url, response)
}

/// POST `body` as JSON to `url` and return the validated JSON response.
pub async fn post_json<T>(
    transport: &dyn Transport,
    url: &Url,
    body: &T,
) -> Result<JsonValue, TransportError>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(body).map_err(|source| TransportError::Serialization {
        url: url.clone(),
        source,
    })?;
    let response = transport.post(url, Bytes::from(payload)).await?;
    check_response(url, response)
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// `timeout` applies to the whole request/response cycle. `None` leaves
    /// requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(ReqwestTransport { client })
    }

    async fn into_raw(
        url: &Url,
        response: reqwest::Response,
    ) -> Result<RawResponse, TransportError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::RequestFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Self::into_raw(url, response).await
    }

    async fn post(&self, url: &Url, body: Bytes) -> Result<RawResponse, TransportError> {
        tracing::debug!(%url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Self::into_raw(url, response).await
    }
}
