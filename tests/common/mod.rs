//! Test transports for askstream integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use askstream::client::{AskClient, ByteStream, ClientError, Transport};
use askstream::model::AskBody;
use askstream::options::{AskOptions, SecretString};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Transport that replays a fixed list of deliveries, then closes.
///
/// The body of the last request is kept for assertions.
pub struct ScriptedTransport {
    deliveries: Vec<Result<Vec<u8>, String>>,
    api_key: Option<SecretString>,
    last_body: Mutex<Option<AskBody>>,
}

impl ScriptedTransport {
    pub fn new(deliveries: Vec<Result<Vec<u8>, String>>) -> Self {
        Self {
            deliveries,
            api_key: Some(SecretString::from("test-key")),
            last_body: Mutex::new(None),
        }
    }

    /// One delivery per text chunk.
    pub fn from_chunks(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
    }

    /// One delivery per byte slice.
    pub fn from_bytes(chunks: Vec<Vec<u8>>) -> Self {
        Self::new(chunks.into_iter().map(Ok).collect())
    }

    pub fn last_body(&self) -> Option<AskBody> {
        self.last_body.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, body: &AskBody) -> Result<ByteStream, ClientError> {
        *self.last_body.lock().unwrap() = Some(body.clone());

        let items: Vec<Result<Bytes, ClientError>> = self
            .deliveries
            .iter()
            .map(|d| match d {
                Ok(bytes) => Ok(Bytes::from(bytes.clone())),
                Err(cause) => Err(ClientError::TransportRead(cause.clone())),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }
}

/// Transport whose deliveries are pushed by the test one at a time.
pub struct GatedTransport {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<Bytes, ClientError>>>>,
}

impl GatedTransport {
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<Bytes, ClientError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn open(&self, _body: &AskBody) -> Result<ByteStream, ClientError> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ClientError::Connection("already opened".to_string()))?;

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

/// Transport that never finishes connecting.
pub struct HangingTransport;

#[async_trait]
impl Transport for HangingTransport {
    async fn open(&self, _body: &AskBody) -> Result<ByteStream, ClientError> {
        futures::future::pending().await
    }
}

pub fn client<T: Transport + 'static>(transport: T) -> AskClient<T> {
    AskClient::new(transport, AskOptions::default())
}
