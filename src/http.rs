//! HTTP transport for the streaming question endpoint.
//!
//! This module builds the reqwest client from transport options and turns
//! the response body into the [`ByteStream`] the stream driver reads from.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::client::{ByteStream, ClientError, Transport};
use crate::model::AskBody;
use crate::options::{HttpTransport, SecretString, TransportOptions};

/// Path of the streaming endpoint, relative to the base URL.
pub const STREAM_PATH: &str = "/stream";

/// Build a configured HTTP client from transport options.
///
/// This applies the whole-request timeout and the proxy, if any.
pub fn build_http_client(
    transport_options: &TransportOptions<HttpTransport>,
) -> Result<Client, ClientError> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.provider.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Config(format!("invalid proxy {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Join the base URL and the streaming path without doubling slashes.
pub fn stream_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), STREAM_PATH)
}

/// [`Transport`] that POSTs the question as JSON and streams the body.
pub struct HttpStreamTransport {
    options: TransportOptions<HttpTransport>,
    client: Client,
    url: String,
}

impl HttpStreamTransport {
    /// Create the transport. Fails when no base URL is configured or the
    /// HTTP client cannot be built.
    pub fn new(options: TransportOptions<HttpTransport>) -> Result<Self, ClientError> {
        let base_url = options
            .provider
            .base_url
            .as_deref()
            .ok_or_else(|| ClientError::Config("base URL is required".to_string()))?;
        let url = stream_url(base_url);
        let client = build_http_client(&options)?;

        Ok(Self {
            options,
            client,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpStreamTransport {
    async fn open(&self, body: &AskBody) -> Result<ByteStream, ClientError> {
        let mut req = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream");
        req = add_extra_headers(req, &self.options.provider.extra_headers);

        let response = req
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Connection(format!("HTTP {}: {}", status, text)));
        }

        if response.content_length() == Some(0) {
            return Err(ClientError::MissingBody);
        }

        debug!("Streaming response from {} ({})", self.url, status);
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClientError::TransportRead(e.to_string())));

        Ok(Box::pin(bytes))
    }

    fn api_key(&self) -> Option<&SecretString> {
        self.options.provider.api_key.as_ref()
    }

    fn idle_timeout(&self) -> Option<Duration> {
        self.options.idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(base_url: Option<&str>) -> TransportOptions<HttpTransport> {
        let mut provider = HttpTransport::new("test");
        provider.base_url = base_url.map(str::to_string);
        TransportOptions::new(provider)
    }

    #[test]
    fn test_stream_url() {
        assert_eq!(stream_url("http://localhost:7091"), "http://localhost:7091/stream");
        assert_eq!(stream_url("http://localhost:7091/"), "http://localhost:7091/stream");
        assert_eq!(stream_url("https://host/api/"), "https://host/api/stream");
    }

    #[test]
    fn test_transport_requires_base_url() {
        assert!(matches!(
            HttpStreamTransport::new(options(None)),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_transport_exposes_options() {
        let transport = HttpStreamTransport::new(
            options(Some("http://localhost:7091")).with_idle_timeout(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(transport.url(), "http://localhost:7091/stream");
        assert_eq!(transport.api_key().map(|k| k.expose_secret()), Some("test"));
        assert_eq!(transport.idle_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let mut transport_options = options(Some("http://localhost"));
        transport_options.provider.proxy = Some("http://proxy.example.com:8080".to_string());
        transport_options.timeout = Some(Duration::from_secs(30));
        assert!(build_http_client(&transport_options).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Port 9 (discard) is closed on test machines
        let transport = HttpStreamTransport::new(options(Some("http://127.0.0.1:9"))).unwrap();
        let body = AskBody {
            question: "q".to_string(),
            api_key: String::new(),
            embeddings_key: String::new(),
            active_docs: "default".to_string(),
            history: "[]".to_string(),
            conversation_id: None,
            model: "default".to_string(),
            prompt_id: "default".to_string(),
            chunks: "2".to_string(),
        };
        let err = transport.open(&body).await.err().unwrap();
        assert!(err.is_connection_error());
    }
}
