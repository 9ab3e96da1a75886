//! HTTP fetching for the transfer engine.
//!
//! The engine talks to the network through the [`Fetch`] trait so tests and
//! embedders can plug in their own transport. [`HttpClient`] is the default
//! implementation on top of `reqwest`.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::FetchError;
use crate::user_agent;

/// Readable response body.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

/// Response head plus a readable body.
pub struct FetchResponse {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Declared body length, when the server sent one.
    pub content_length: Option<u64>,
    /// The body, read in caller-sized chunks.
    pub body: BodyReader,
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests for the transfer engine.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Sends a GET for `url` and returns the response head and body.
    ///
    /// Non-success statuses are returned as responses, not errors; the engine
    /// decides what they mean.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request cannot be built or no response
    /// is received.
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Timeout configuration for [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum idle time between body reads. `None` means no limit, so a
    /// transfer has no overall deadline.
    pub read_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: None,
        }
    }
}

/// HTTP client for streaming downloads.
///
/// This client is designed to be created once and reused for multiple
/// transfers, taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_config(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(user_agent::default_user_agent());
        if let Some(read_timeout) = config.read_timeout {
            builder = builder.read_timeout(read_timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetch for HttpClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::network(url, e)
            }
        })?;

        let status = response.status();
        let content_length = declared_length(&response);
        debug!(status = status.as_u16(), ?content_length, "response received");

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(FetchResponse {
            status,
            content_length,
            body: Box::pin(StreamReader::new(stream)),
        })
    }
}

fn declared_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_returns_status_length_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello body".to_vec()))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let url = format!("{}/file.bin", mock_server.uri());
        let mut response = client.get(&url).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_length, Some(10));
        let mut body = Vec::new();
        response.body.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"hello body");
    }

    #[tokio::test]
    async fn test_get_passes_error_status_through() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let response = client.get(&mock_server.uri()).await.unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_get_rejects_invalid_url() {
        let client = HttpClient::new().unwrap();
        let result = client.get("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_get_rejects_non_http_scheme() {
        let client = HttpClient::new().unwrap();
        let result = client.get("ftp://example.com/file.bin").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_get_connection_refused_is_network_error() {
        // Bind then drop a listener to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpClient::new().unwrap();
        let result = client.get(&format!("http://127.0.0.1:{port}/x")).await;
        assert!(
            matches!(
                result,
                Err(FetchError::Network { .. } | FetchError::Timeout { .. })
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn test_client_config_default_has_no_read_timeout() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(CONNECT_TIMEOUT_SECS));
        assert!(config.read_timeout.is_none());
    }
}
