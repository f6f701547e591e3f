//! Options structures for question defaults and transport configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::ClientError;

/// Sentinel knowledge scope used when the caller does not pick one.
pub const DEFAULT_SCOPE: &str = "default";

/// Sentinel model selector used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "default";

/// Sentinel prompt template identifier.
pub const DEFAULT_PROMPT_ID: &str = "default";

/// Default number of retrieved chunks the server should cite from.
pub const DEFAULT_CHUNKS: u32 = 2;

/// Literal prefix the server places in front of each streamed frame.
pub const DEFAULT_FRAME_PREFIX: &str = "data: ";

/// Environment variable read by [`HttpTransport::from_env`] for the API base URL.
pub const BASE_URL_ENV: &str = "ASKSTREAM_BASE_URL";

/// Environment variable read by [`HttpTransport::from_env`] for the access credential.
pub const API_KEY_ENV: &str = "ASKSTREAM_API_KEY";

/// A secret string type for access credentials.
/// Prevents accidental logging or display of secrets.
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Defaults applied to every question sent through a client.
///
/// Fields left unset on an individual [`AskRequest`](crate::model::AskRequest)
/// fall back to these values, which in turn fall back to the sentinel
/// constants of this module.
///
/// # Example
/// ```rust
/// use askstream::options::AskOptions;
///
/// let options = AskOptions::default()
///     .with_scope("local/handbook".to_string())
///     .with_chunks(4);
/// assert_eq!(options.scope(), "local/handbook");
/// assert_eq!(options.model(), "default");
/// ```
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Knowledge scope the server should answer from
    pub scope: Option<String>,

    /// Model selector
    pub model: Option<String>,

    /// Prompt template identifier
    pub prompt_id: Option<String>,

    /// Number of retrieved chunks
    pub chunks: Option<u32>,

    /// Framing prefix stripped from each frame; `None` means the server default
    pub frame_prefix: Option<String>,
}

impl AskOptions {
    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_prompt_id(mut self, prompt_id: String) -> Self {
        self.prompt_id = Some(prompt_id);
        self
    }

    pub fn with_chunks(mut self, chunks: u32) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Register a different framing prefix.
    pub fn with_frame_prefix(mut self, prefix: String) -> Self {
        self.frame_prefix = Some(prefix);
        self
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn prompt_id(&self) -> &str {
        self.prompt_id.as_deref().unwrap_or(DEFAULT_PROMPT_ID)
    }

    pub fn chunks(&self) -> u32 {
        self.chunks.unwrap_or(DEFAULT_CHUNKS)
    }

    pub fn frame_prefix(&self) -> &str {
        self.frame_prefix.as_deref().unwrap_or(DEFAULT_FRAME_PREFIX)
    }
}

/// Generic transport options containing the timeouts every transport honours
/// and transport-specific configuration.
///
/// # Type Parameters
/// - `T`: Transport-specific options type
///
/// # Example
/// ```rust
/// use askstream::options::{HttpTransport, SecretString, TransportOptions};
/// use std::time::Duration;
///
/// let options = TransportOptions::new(
///     HttpTransport::new(SecretString::new("key".to_string()))
///         .with_base_url("http://localhost:7091".to_string()),
/// )
/// .with_idle_timeout(Duration::from_secs(30));
/// assert!(options.timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions<T> {
    /// Whole-request timeout, including the streamed body
    pub timeout: Option<Duration>,

    /// Longest allowed gap between two deliveries; `None` waits forever
    pub idle_timeout: Option<Duration>,

    /// Transport-specific options
    pub provider: T,
}

impl<T> TransportOptions<T> {
    pub fn new(provider: T) -> Self {
        Self {
            timeout: None,
            idle_timeout: None,
            provider,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }
}

/// HTTP-specific transport options.
/// Used as the provider field in `TransportOptions<HttpTransport>`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    /// Access credential, also forwarded as the embeddings credential
    pub api_key: Option<SecretString>,

    /// Base URL of the question-answering API
    pub base_url: Option<String>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl HttpTransport {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Build transport options from `ASKSTREAM_BASE_URL` and `ASKSTREAM_API_KEY`.
    ///
    /// The base URL is required; a missing credential is allowed because
    /// some deployments serve anonymous questions.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| ClientError::Config(format!("{} is not set", BASE_URL_ENV)))?;

        Ok(Self {
            api_key: std::env::var(API_KEY_ENV).ok().map(SecretString::new),
            base_url: Some(base_url),
            ..Self::default()
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
