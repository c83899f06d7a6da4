//! Byte Stream Abstraction
//!
//! Chunked, abortable reads of a track's compressed body. Chunk granularity is
//! whatever the transport delivers and carries no meaning for decoding.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;

use crate::error::Result;

/// An open, abortable byte stream for one track.
///
/// Implementations return `Ok(Some(chunk))` for each piece of the body,
/// `Ok(None)` at end of stream, and `Err` when the transport fails. After
/// [`abort`](ByteStream::abort) every subsequent read must return `Ok(None)`
/// and the underlying connection or file handle should be released.
#[async_trait]
pub trait ByteStream: Send {
    /// Read the next chunk, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Abort the stream and release the underlying resource. Idempotent.
    fn abort(&mut self);

    /// Total body length, when the transport reports one.
    fn content_length(&self) -> Option<u64> {
        None
    }
}

/// Opens byte streams for track URLs.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::stream::ByteSource;
///
/// async fn body_len(source: &dyn ByteSource, url: &str) -> Result<usize> {
///     let mut stream = source.open(url).await?;
///     let mut total = 0;
///     while let Some(chunk) = stream.next_chunk().await? {
///         total += chunk.len();
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Open a stream for `url`.
    ///
    /// # Errors
    ///
    /// Returns error if the resource cannot be reached or the server refuses it.
    async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>>;
}

/// A byte stream over data already held in memory.
///
/// Used to replay cached blobs through the same streaming path as network
/// bodies, and handy as a fixture.
#[derive(Debug, Default)]
pub struct MemoryByteStream {
    chunks: VecDeque<Bytes>,
    total: u64,
}

impl MemoryByteStream {
    /// Build a stream that yields the given chunks in order.
    pub fn new(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        let chunks: VecDeque<Bytes> = chunks.into_iter().collect();
        let total = chunks.iter().map(|c| c.len() as u64).sum();
        Self { chunks, total }
    }

    /// Split `data` into chunks of at most `chunk_size` bytes.
    ///
    /// A `chunk_size` of zero yields the whole body as one chunk.
    pub fn chunked(data: Bytes, chunk_size: usize) -> Self {
        if chunk_size == 0 || data.len() <= chunk_size {
            return Self::new((!data.is_empty()).then_some(data));
        }

        let mut chunks = Vec::with_capacity(data.len().div_ceil(chunk_size));
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + chunk_size).min(data.len());
            chunks.push(data.slice(offset..end));
            offset = end;
        }
        Self::new(chunks)
    }

    /// Number of chunks not yet read.
    pub fn remaining_chunks(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl ByteStream for MemoryByteStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }

    fn abort(&mut self) {
        self.chunks.clear();
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.total)
    }
}
