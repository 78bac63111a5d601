use crate::api::ApiClient;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde_json::Value as JsonValue;
use shared::http::{RawResponse, Transport, TransportError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub const TEST_BASE_URL: &str = "http://upstream.test";

enum MockReply {
    Response(RawResponse),
    ConnectionError,
    Hang,
    Panic,
}

/// In-memory transport serving canned replies keyed by URL path.
///
/// Unknown paths answer 404. POST bodies are recorded for inspection.
pub struct MockTransport {
    replies: HashMap<String, MockReply>,
    delay: Option<Duration>,
    posts: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            replies: HashMap::new(),
            delay: None,
            posts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_json(self, path: &str, body: JsonValue) -> Self {
        self.with_reply(path, MockReply::Response(RawResponse::json(&body)))
    }

    pub fn with_status(self, path: &str, status: u16) -> Self {
        self.with_raw(path, status, Some("application/json"), "{}")
    }

    pub fn with_raw(self, path: &str, status: u16, content_type: Option<&str>, body: &str) -> Self {
        let response = RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.map(str::to_string),
            body: Bytes::from(body.to_string()),
        };
        self.with_reply(path, MockReply::Response(response))
    }

    pub fn with_error(self, path: &str) -> Self {
        self.with_reply(path, MockReply::ConnectionError)
    }

    pub fn with_hang(self, path: &str) -> Self {
        self.with_reply(path, MockReply::Hang)
    }

    pub fn with_panic(self, path: &str) -> Self {
        self.with_reply(path, MockReply::Panic)
    }

    /// Delays every reply, so that concurrent requests overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with_reply(mut self, path: &str, reply: MockReply) -> Self {
        self.replies.insert(path.to_string(), reply);
        self
    }

    /// Recorded POSTs as `(path, body)`, the body exactly as sent.
    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn reply(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.replies.get(url.path()) {
            Some(MockReply::Response(response)) => Ok(response.clone()),
            Some(MockReply::ConnectionError) => Err(TransportError::RequestFailed {
                url: url.clone(),
                message: "connection refused".into(),
            }),
            Some(MockReply::Hang) => std::future::pending().await,
            Some(MockReply::Panic) => panic!("mock transport panic for {url}"),
            None => Ok(RawResponse {
                status: StatusCode::NOT_FOUND,
                content_type: Some("text/plain".into()),
                body: Bytes::from_static(b"not found"),
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        self.reply(url).await
    }

    async fn post(&self, url: &Url, body: Bytes) -> Result<RawResponse, TransportError> {
        let body = String::from_utf8(body.to_vec()).unwrap();
        self.posts
            .lock()
            .unwrap()
            .push((url.path().to_string(), body));
        self.reply(url).await
    }
}

pub fn test_client(transport: MockTransport) -> ApiClient {
    test_client_with(Arc::new(transport))
}

pub fn test_client_with(transport: Arc<MockTransport>) -> ApiClient {
    ApiClient::new(transport, Url::parse(TEST_BASE_URL).unwrap()).unwrap()
}
