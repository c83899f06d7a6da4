//! # Host Bridge Traits
//!
//! Collaborator contracts that the playback core depends on but does not
//! implement itself.
//!
//! ## Overview
//!
//! The DFPWM playback core is a pure transducer wrapped in a streaming loop. Everything
//! around it (fetching compressed bytes, rendering sound, persisting cached
//! blobs, forwarding logs to the host) is supplied by the host through the
//! traits in this crate. Desktop implementations live in `bridge-desktop`.
//!
//! ## Traits
//!
//! ### Input
//! - [`ByteSource`](stream::ByteSource) - Opens an abortable chunked byte stream for a track URL
//! - [`ByteStream`](stream::ByteStream) - "Read next chunk or end" with cooperative abort
//!
//! ### Output
//! - [`AudioSink`](playback::AudioSink) - Accepts a decoded PCM buffer plus sample rate,
//!   exposes play/pause/stop and elapsed time
//!
//! ### Storage
//! - [`BlobStore`](storage::BlobStore) - Persistent key/value store of compressed track bytes,
//!   addressed by track URL
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Include error context (URL, HTTP status, file path)
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send` (streams) or `Send + Sync` (sources, sinks, stores) so
//! they can be shared across async tasks behind an `Arc`.
//!
//! ## Examples
//!
//! ### Implementing AudioSink
//!
//! ```ignore
//! use bridge_traits::playback::{AudioSink, PcmBuffer, SinkState};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! pub struct NullSink;
//!
//! #[async_trait]
//! impl AudioSink for NullSink {
//!     async fn load(&self, buffer: PcmBuffer) -> Result<()> { Ok(()) }
//!     async fn play(&self) -> Result<()> { Ok(()) }
//!     async fn pause(&self) -> Result<()> { Ok(()) }
//!     async fn stop(&self) -> Result<()> { Ok(()) }
//!     async fn elapsed(&self) -> Result<Duration> { Ok(Duration::ZERO) }
//!     async fn state(&self) -> Result<SinkState> { Ok(SinkState::Idle) }
//! }
//! ```

pub mod error;
pub mod log;
pub mod playback;
pub mod storage;
pub mod stream;

pub use error::BridgeError;

// Re-export commonly used types
pub use playback::{AudioSink, PcmBuffer, SinkState};
pub use storage::BlobStore;
pub use stream::{ByteSource, ByteStream, MemoryByteStream};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
