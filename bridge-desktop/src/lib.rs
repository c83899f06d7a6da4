//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ByteSource` over HTTP(S) using `reqwest` response streaming
//! - `ByteSource` over local files using `tokio::fs`
//! - `BlobStore` backed by a cache directory on disk
//!
//! The audio sink is deliberately absent: rendering is the host's concern.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FsBlobStore, ReqwestByteSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(ReqwestByteSource::new());
//!     let store = Arc::new(FsBlobStore::new());
//!
//!     // Hand both to CoreConfig::builder()
//! }
//! ```

mod filesystem;
mod http;

pub use filesystem::{FileByteSource, FsBlobStore};
pub use http::ReqwestByteSource;
