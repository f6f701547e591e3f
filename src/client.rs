//! Question client, transport trait and error types.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelHandle;
use crate::model::{AskBody, AskRequest, Event, Exchange};
use crate::options::{AskOptions, SecretString};
use crate::parser::FrameParser;
use crate::stream::{EventStream, SessionHandle};

/// Error returned by an event handler to halt its session.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Raw deliveries of one streamed response body, in transport order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Errors that can occur while asking a question.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Response has no readable body")]
    MissingBody,

    #[error("Transport read error: {0}")]
    TransportRead(String),

    #[error("No data received for {0:?}")]
    IdleTimeout(Duration),

    #[error("Malformed frame `{frame}`: {source}")]
    MalformedFrame {
        frame: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event handler failed: {0}")]
    Handler(#[source] HandlerError),

    #[error("Session task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build a malformed-frame error, keeping only the start of the frame.
    pub fn malformed_frame(frame: &str, source: serde_json::Error) -> Self {
        Self::MalformedFrame {
            frame: frame.chars().take(100).collect(),
            source,
        }
    }

    /// Whether this error ends the session. Malformed frames are skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedFrame { .. })
    }

    /// Whether this error happened before any delivery was read.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Connection(_) | Self::MissingBody | Self::Config(_)
        )
    }
}

/// Opens the streamed connection for one question.
///
/// [`HttpStreamTransport`](crate::http::HttpStreamTransport) is the
/// production implementation; tests drive sessions with scripted transports.
///
/// # Example
/// ```rust,ignore
/// struct Canned(Vec<&'static str>);
///
/// #[async_trait]
/// impl Transport for Canned {
///     async fn open(&self, _body: &AskBody) -> Result<ByteStream, ClientError> {
///         let chunks: Vec<_> = self.0.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
///         Ok(Box::pin(futures::stream::iter(chunks)))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the response body as a byte stream.
    ///
    /// Fails with a connection-level [`ClientError`] when the server cannot
    /// be reached or the response carries no readable body.
    async fn open(&self, body: &AskBody) -> Result<ByteStream, ClientError>;

    /// Access credential placed in the request body.
    fn api_key(&self) -> Option<&SecretString> {
        None
    }

    /// Longest gap allowed between two deliveries.
    fn idle_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Client that asks questions over a [`Transport`] and streams back events.
///
/// Cloning is cheap; clones share the transport.
pub struct AskClient<T> {
    transport: Arc<T>,
    options: AskOptions,
}

impl<T> Clone for AskClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            options: self.options.clone(),
        }
    }
}

impl<T: Transport + 'static> AskClient<T> {
    pub fn new(transport: T, options: AskOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            options,
        }
    }

    pub fn options(&self) -> &AskOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Ask a question and return the answer as an [`EventStream`].
    ///
    /// Connection-level failures are returned here; everything after the
    /// body is readable arrives through the stream.
    pub async fn ask(&self, request: AskRequest) -> Result<EventStream, ClientError> {
        self.ask_with_cancel(request, CancelHandle::new()).await
    }

    /// Like [`ask`](Self::ask), but wired to an existing cancellation handle.
    ///
    /// Cancelling while the connection is still being opened returns an
    /// empty stream in the `Cancelled` state.
    pub async fn ask_with_cancel(
        &self,
        request: AskRequest,
        cancel: CancelHandle,
    ) -> Result<EventStream, ClientError> {
        let body = self.build_body(request)?;
        let parser = FrameParser::new(self.options.frame_prefix());

        EventStream::open(
            self.transport.as_ref(),
            &body,
            parser,
            cancel,
            self.transport.idle_timeout(),
        )
        .await
    }

    /// Ask a question on a background task and feed every event to `handler`.
    ///
    /// A connection failure reaches the handler as a terminal
    /// [`Event::Error`] before the handle resolves with the error. Returning
    /// an error from the handler halts the session.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, since the session runs on
    /// a task spawned with [`tokio::spawn`].
    pub fn ask_with_handler<F>(&self, request: AskRequest, mut handler: F) -> SessionHandle
    where
        F: FnMut(Event) -> Result<(), HandlerError> + Send + 'static,
    {
        let cancel = CancelHandle::new();
        let client = self.clone();
        let session_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let stream = match client.ask_with_cancel(request, session_cancel).await {
                Ok(stream) => stream,
                Err(err) => {
                    handler(Event::Error {
                        cause: err.to_string(),
                    })
                    .map_err(ClientError::Handler)?;
                    return Err(err);
                }
            };
            stream.dispatch(handler).await
        });

        SessionHandle::new(cancel, task)
    }

    /// Assemble the wire body, applying option defaults.
    pub fn build_body(&self, request: AskRequest) -> Result<AskBody, ClientError> {
        let api_key = self
            .transport
            .api_key()
            .map(|key| key.expose_secret().to_string())
            .unwrap_or_default();

        let history = serialize_history(&request.history)?;
        debug!(
            "Building question body: {} prior exchanges, conversation={:?}",
            request.history.len(),
            request.conversation_id
        );

        Ok(AskBody {
            question: request.question,
            embeddings_key: api_key.clone(),
            api_key,
            active_docs: request
                .scope
                .unwrap_or_else(|| self.options.scope().to_string()),
            history,
            conversation_id: request.conversation_id,
            model: request
                .model
                .unwrap_or_else(|| self.options.model().to_string()),
            prompt_id: self.options.prompt_id().to_string(),
            chunks: self.options.chunks().to_string(),
        })
    }
}

/// Prior exchanges travel as a JSON document embedded in a string field.
fn serialize_history(history: &[Exchange]) -> Result<String, ClientError> {
    serde_json::to_string(history)
        .map_err(|e| ClientError::Config(format!("history is not serializable: {}", e)))
}
