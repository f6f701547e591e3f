//! Stream driver: read → decode → reassemble → parse → dispatch.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cancel::CancelHandle;
use crate::client::{ByteStream, ClientError, HandlerError, Transport};
use crate::model::{AskBody, Event};
use crate::parser::FrameParser;
use crate::session::{SessionOutcome, SessionState, StreamSession};

/// Result of waiting for the next delivery.
enum Read {
    Delivery(Bytes),
    Eof,
    Failed(ClientError),
    Cancelled,
}

/// Ordered events of one streamed answer.
///
/// Pull events with [`next`](Self::next), convert into a
/// [`futures::Stream`] with [`into_stream`](Self::into_stream), or push
/// them into a handler with [`dispatch`](Self::dispatch). At most one `End`
/// or `Error` is yielded, and always last. A connection the server closes
/// without an end frame, or a cancelled session, simply stops.
///
/// # Example
/// ```ignore
/// let mut events = client.ask(AskRequest::new("How do I install it?")).await?;
/// while let Some(event) = events.next().await {
///     match event {
///         Event::Token { text } => print!("{}", text),
///         Event::Source { title, .. } => println!("\n[{}]", title),
///         _ => {}
///     }
/// }
/// ```
pub struct EventStream {
    session: StreamSession,
    body: Option<ByteStream>,
    queue: VecDeque<Event>,
    idle_timeout: Option<Duration>,
    error: Option<ClientError>,
}

impl EventStream {
    /// Open the connection through `transport` and start streaming.
    pub async fn open<T: Transport + ?Sized>(
        transport: &T,
        body: &AskBody,
        parser: FrameParser,
        cancel: CancelHandle,
        idle_timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut session = StreamSession::new(parser, cancel.clone());
        session.begin_request();
        info!(
            "Asking question in scope {:?} with model {:?}",
            body.active_docs, body.model
        );

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = transport.open(body) => Some(result),
        };

        let Some(result) = opened else {
            session.mark_cancelled();
            return Ok(Self::with_body(session, None, idle_timeout));
        };

        match result {
            Ok(body) => {
                session.begin_streaming();
                Ok(Self::with_body(session, Some(body), idle_timeout))
            }
            Err(err) => {
                session.mark_failed(&err);
                Err(err)
            }
        }
    }

    /// Wrap an already open byte stream.
    pub fn from_body(
        body: ByteStream,
        parser: FrameParser,
        cancel: CancelHandle,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let mut session = StreamSession::new(parser, cancel);
        session.begin_request();
        session.begin_streaming();
        Self::with_body(session, Some(body), idle_timeout)
    }

    fn with_body(
        session: StreamSession,
        body: Option<ByteStream>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            session,
            body,
            queue: VecDeque::new(),
            idle_timeout,
            error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.session.outcome()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.session.cancel_handle().clone()
    }

    /// The error that failed the session, if any.
    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// Next event in arrival order, or `None` once the session is over.
    ///
    /// Cancellation is checked before every event is handed out, so events
    /// already classified from an in-flight delivery are suppressed too. A
    /// suppressed `End` or `Error` leaves the session `Cancelled` with no
    /// error to report.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            if self.session.is_cancelled() {
                if !self.queue.is_empty() {
                    debug!("Cancelled with {} events pending", self.queue.len());
                    self.session.force_cancelled();
                    self.error = None;
                } else {
                    self.session.mark_cancelled();
                }
                self.queue.clear();
                self.body = None;
                return None;
            }

            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }

            if self.session.state().is_terminal() {
                self.body = None;
                return None;
            }

            match self.read().await {
                Read::Delivery(bytes) => {
                    let events = self.session.process_delivery(&bytes);
                    self.queue.extend(events);
                }
                Read::Eof => {
                    self.body = None;
                    let events = self.session.finish_input();
                    self.queue.extend(events);
                }
                Read::Failed(err) => {
                    self.body = None;
                    self.session.mark_failed(&err);
                    self.queue.push_back(Event::Error {
                        cause: err.to_string(),
                    });
                    self.error = Some(err);
                }
                // picked up at the top of the loop
                Read::Cancelled => {}
            }
        }
    }

    /// Wait for the next delivery, abandoning the read on cancellation.
    async fn read(&mut self) -> Read {
        let Some(body) = self.body.as_mut() else {
            return Read::Eof;
        };
        let cancel = self.session.cancel_handle().clone();
        let idle_timeout = self.idle_timeout;

        let delivery = async move {
            match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, body.next())
                    .await
                    .map_err(|_| ClientError::IdleTimeout(limit)),
                None => Ok(body.next().await),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Read::Cancelled,
            result = delivery => match result {
                Ok(Some(Ok(bytes))) => Read::Delivery(bytes),
                Ok(Some(Err(err))) => Read::Failed(err),
                Ok(None) => Read::Eof,
                Err(err) => Read::Failed(err),
            },
        }
    }

    /// Feed every event to `handler` in order.
    ///
    /// Resolves with the session outcome once the session is over. A
    /// transport failure is delivered as [`Event::Error`] and then returned;
    /// a cancelled session resolves `Ok`. If the handler fails, the session
    /// stops and the handler's error is returned.
    pub async fn dispatch<F>(mut self, mut handler: F) -> Result<SessionOutcome, ClientError>
    where
        F: FnMut(Event) -> Result<(), HandlerError>,
    {
        while let Some(event) = self.next().await {
            if let Err(err) = handler(event) {
                self.session.abort();
                self.body = None;
                return Err(ClientError::Handler(err));
            }
        }

        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self.session.outcome()),
        }
    }

    /// Concatenate every token of the answer.
    pub async fn collect_answer(mut self) -> Result<String, ClientError> {
        let mut answer = String::new();
        while let Some(event) = self.next().await {
            if let Event::Token { text } = event {
                answer.push_str(&text);
            }
        }
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(answer),
        }
    }

    /// Convert into a [`futures::Stream`] of events.
    pub fn into_stream(self) -> impl Stream<Item = Event> + Send {
        stream::unfold(self, |mut events| async move {
            let event = events.next().await?;
            Some((event, events))
        })
    }
}

/// Cancellable handle to a session running on a background task.
///
/// Awaiting the handle yields the session's final result.
pub struct SessionHandle {
    cancel: CancelHandle,
    task: JoinHandle<Result<SessionOutcome, ClientError>>,
}

impl SessionHandle {
    pub(crate) fn new(
        cancel: CancelHandle,
        task: JoinHandle<Result<SessionOutcome, ClientError>>,
    ) -> Self {
        Self { cancel, task }
    }

    /// Stop the session. No further events reach the handler.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for SessionHandle {
    type Output = Result<SessionOutcome, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(err) => Err(ClientError::Task(err.to_string())),
        })
    }
}
