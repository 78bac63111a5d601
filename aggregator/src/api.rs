use crate::config::ValidationError;
use crate::errors::Result;
use crate::protocol::{DealerId, VehicleId};
use serde::Serialize;
use serde_json::Value as JsonValue;
use shared::http::{Transport, get_json, post_json};
use std::sync::Arc;
use url::Url;

/// Upstream API endpoints. Ids are substituted as single path segments.
#[derive(Clone, Copy, Debug)]
pub enum Endpoint<'a> {
    DatasetId,
    Vehicles {
        dataset_id: &'a str,
    },
    Vehicle {
        dataset_id: &'a str,
        vehicle_id: VehicleId,
    },
    Dealer {
        dataset_id: &'a str,
        dealer_id: DealerId,
    },
    Answer {
        dataset_id: &'a str,
    },
}

impl Endpoint<'_> {
    fn segments(&self) -> Vec<String> {
        match *self {
            Endpoint::DatasetId => vec!["api".into(), "datasetid".into()],
            Endpoint::Vehicles { dataset_id } => {
                vec!["api".into(), dataset_id.into(), "vehicles".into()]
            }
            Endpoint::Vehicle {
                dataset_id,
                vehicle_id,
            } => vec![
                "api".into(),
                dataset_id.into(),
                "vehicles".into(),
                vehicle_id.to_string(),
            ],
            Endpoint::Dealer {
                dataset_id,
                dealer_id,
            } => vec![
                "api".into(),
                dataset_id.into(),
                "dealers".into(),
                dealer_id.to_string(),
            ],
            Endpoint::Answer { dataset_id } => {
                vec!["api".into(), dataset_id.into(), "answer".into()]
            }
        }
    }
}

/// Thin client over a [`Transport`] that knows the API's URL layout.
///
/// Cloning is cheap; clones share the transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url) -> Result<Self, ValidationError> {
        if base_url.cannot_be_a_base() {
            return Err(ValidationError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(ApiClient {
            transport,
            base_url,
        })
    }

    /// Builds the full URL of `endpoint`, keeping any path prefix of the base URL.
    pub fn url(&self, endpoint: Endpoint<'_>) -> Url {
        let mut url = self.base_url.clone();
        // Infallible: cannot-be-a-base URLs are rejected in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(endpoint.segments());
        }
        url
    }

    /// GETs `endpoint`, returning the URL that was hit alongside the decoded body.
    pub async fn get(&self, endpoint: Endpoint<'_>) -> Result<(Url, JsonValue)> {
        let url = self.url(endpoint);
        let value = get_json(self.transport.as_ref(), &url).await?;
        Ok((url, value))
    }

    pub async fn post<T>(&self, endpoint: Endpoint<'_>, body: &T) -> Result<JsonValue>
    where
        T: Serialize + Sync + ?Sized,
    {
        let url = self.url(endpoint);
        Ok(post_json(self.transport.as_ref(), &url, body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MockTransport;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(Arc::new(MockTransport::new()), Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client("https://upstream.test");
        assert_eq!(
            client.url(Endpoint::DatasetId).as_str(),
            "https://upstream.test/api/datasetid"
        );
        assert_eq!(
            client.url(Endpoint::Vehicles { dataset_id: "7" }).as_str(),
            "https://upstream.test/api/7/vehicles"
        );
        assert_eq!(
            client
                .url(Endpoint::Vehicle {
                    dataset_id: "7",
                    vehicle_id: 42
                })
                .as_str(),
            "https://upstream.test/api/7/vehicles/42"
        );
        assert_eq!(
            client
                .url(Endpoint::Dealer {
                    dataset_id: "7",
                    dealer_id: 100
                })
                .as_str(),
            "https://upstream.test/api/7/dealers/100"
        );
        assert_eq!(
            client.url(Endpoint::Answer { dataset_id: "7" }).as_str(),
            "https://upstream.test/api/7/answer"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let client = client("http://proxy.test/upstream/");
        assert_eq!(
            client.url(Endpoint::DatasetId).as_str(),
            "http://proxy.test/upstream/api/datasetid"
        );
    }

    #[test]
    fn test_dataset_id_is_a_single_segment() {
        let client = client("http://upstream.test");
        assert_eq!(
            client.url(Endpoint::Vehicles { dataset_id: "a/b c" }).as_str(),
            "http://upstream.test/api/a%2Fb%20c/vehicles"
        );
    }

    #[test]
    fn test_cannot_be_a_base_rejected() {
        let result = ApiClient::new(
            Arc::new(MockTransport::new()),
            Url::parse("mailto:someone@example.com").unwrap(),
        );
        assert!(matches!(result, Err(ValidationError::InvalidBaseUrl(_))));
    }
}
