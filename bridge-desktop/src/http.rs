//! Byte Source Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    stream::{ByteSource, ByteStream},
};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Reqwest-based byte source.
///
/// Opens a `GET` for the track URL and exposes the response body as it
/// arrives from the network:
/// - Connection pooling via reqwest
/// - TLS support by default
/// - Optional per-read timeout (a stalled body becomes a transport error)
///
/// No retries are attempted; a failed request surfaces to the caller.
pub struct ReqwestByteSource {
    client: Client,
    read_timeout: Option<Duration>,
}

impl ReqwestByteSource {
    /// Create a byte source with reqwest's default client configuration.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a byte source whose connection attempts give up after `connect_timeout`.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("dfpwm-player/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Create a byte source around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            read_timeout: None,
        }
    }

    /// Fail a read that produces no data within `timeout`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Convert a reqwest error into a bridge error.
    fn map_error(url: &str, e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed(format!("Request to {} timed out", url))
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection to {} failed: {}", url, e))
        } else if let Some(status) = e.status() {
            BridgeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }
}

impl Default for ReqwestByteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteSource for ReqwestByteSource {
    async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>> {
        debug!(url = %url, "Opening HTTP stream");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %url, "HTTP stream refused");
            return Err(BridgeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_length = response.content_length();
        let body = response.bytes_stream().boxed();

        Ok(Box::new(ReqwestByteStream {
            url: url.to_string(),
            body: Some(body),
            content_length,
            read_timeout: self.read_timeout,
            bytes_read: 0,
        }))
    }
}

/// Response body of one `GET`, read chunk by chunk.
struct ReqwestByteStream {
    url: String,
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    content_length: Option<u64>,
    read_timeout: Option<Duration>,
    bytes_read: u64,
}

#[async_trait]
impl ByteStream for ReqwestByteStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };

        let next = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, body.next())
                .await
                .map_err(|_| BridgeError::Timeout(timeout))?,
            None => body.next().await,
        };

        match next {
            Some(Ok(chunk)) => {
                self.bytes_read += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Some(Err(e)) => {
                self.body = None;
                warn!(url = %self.url, bytes_read = self.bytes_read, error = %e, "HTTP body failed");
                Err(ReqwestByteSource::map_error(&self.url, e))
            }
            None => {
                self.body = None;
                debug!(url = %self.url, bytes_read = self.bytes_read, "HTTP body complete");
                Ok(None)
            }
        }
    }

    fn abort(&mut self) {
        if self.body.take().is_some() {
            debug!(url = %self.url, bytes_read = self.bytes_read, "HTTP body aborted");
        }
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}
