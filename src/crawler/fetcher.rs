//! HTTP fetcher implementation
//!
//! This module handles the single outbound call made per listing:
//! - Building the reqwest client with timeouts and compression
//! - Sending one GET with the source's query and headers
//! - Classifying transport failures and status codes
//!
//! The fetcher never retries by itself; retries are driven by the
//! coordinator through its `RetryPolicy`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One outbound request for a listing snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Endpoint without query string
    pub endpoint: Url,
    /// Query parameters, appended in order
    pub query: Vec<(String, String)>,
    /// Headers sent verbatim
    pub headers: Vec<(String, String)>,
}

/// The status and verbatim body of a completed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Failure to obtain any response at all
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request could not be built: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Outcome classification of a single fetch attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed body: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether another attempt may succeed
    ///
    /// | Condition | Retryable |
    /// |-----------|-----------|
    /// | Timeout / connection failure | yes |
    /// | Request could not be built | no |
    /// | HTTP 429 | yes |
    /// | HTTP 5xx | yes |
    /// | Other non-2xx | no |
    /// | Body not JSON / wrong shape | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::InvalidRequest(_)) => false,
            Self::Transport(_) => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::Malformed(_) => false,
        }
    }
}

/// Performs one HTTP call; implemented over reqwest and by test doubles
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `timeout` - Total per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// The production fetch client backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetchClient {
    client: Client,
}

impl HttpFetchClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let mut builder = self.client.get(request.endpoint.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_transport_error)?;

        Ok(FetchResponse { status, body })
    }
}

fn classify_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

/// Maps a completed response to its body or a classified failure
pub fn check_status(response: FetchResponse) -> Result<String, FetchError> {
    if (200..300).contains(&response.status) {
        Ok(response.body)
    } else {
        Err(FetchError::Status(response.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Transport(TransportError::Timeout).is_retryable());
        assert!(FetchError::Transport(TransportError::Connect("refused".into())).is_retryable());
        assert!(FetchError::Status(429).is_retryable());
        assert!(FetchError::Status(503).is_retryable());

        assert!(!FetchError::Status(404).is_retryable());
        assert!(!FetchError::Status(403).is_retryable());
        assert!(!FetchError::Status(302).is_retryable());
        assert!(!FetchError::Malformed("not json".into()).is_retryable());
        assert!(!FetchError::Transport(TransportError::InvalidRequest("bad header".into())).is_retryable());
    }

    #[test]
    fn test_check_status() {
        let ok = FetchResponse {
            status: 200,
            body: "[]".to_string(),
        };
        assert_eq!(check_status(ok).unwrap(), "[]");

        let missing = FetchResponse {
            status: 404,
            body: String::new(),
        };
        assert_eq!(check_status(missing), Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_http_fetch_sends_query_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/rec"))
            .and(query_param("list_id", "123"))
            .and(header("origin", "https://www.olx.com.br"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpFetchClient::new(Duration::from_secs(5)).unwrap();
        let request = FetchRequest {
            endpoint: Url::parse(&format!("{}/api/v2/rec", server.uri())).unwrap(),
            query: vec![("list_id".to_string(), "123".to_string())],
            headers: vec![("Origin".to_string(), "https://www.olx.com.br".to_string())],
        };

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "[]");
    }

    #[tokio::test]
    async fn test_http_fetch_returns_error_status_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpFetchClient::new(Duration::from_secs(5)).unwrap();
        let request = FetchRequest {
            endpoint: Url::parse(&server.uri()).unwrap(),
            query: vec![],
            headers: vec![],
        };

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_http_fetch_connection_refused() {
        let client = HttpFetchClient::new(Duration::from_secs(2)).unwrap();
        let request = FetchRequest {
            endpoint: Url::parse("http://127.0.0.1:9/").unwrap(),
            query: vec![],
            headers: vec![],
        };

        assert!(client.fetch(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_http_fetch_invalid_header_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(0)
            .mount(&server)
            .await;

        let client = HttpFetchClient::new(Duration::from_secs(5)).unwrap();
        let request = FetchRequest {
            endpoint: Url::parse(&server.uri()).unwrap(),
            query: vec![],
            headers: vec![("User Agent".to_string(), "ripple".to_string())],
        };

        let error = client.fetch(&request).await.unwrap_err();
        assert!(matches!(error, TransportError::InvalidRequest(_)));
        assert!(!FetchError::from(error).is_retryable());
    }
}
