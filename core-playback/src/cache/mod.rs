//! # Offline Cache Module
//!
//! Read-through / write-behind cache of compressed track bodies.
//!
//! ## Overview
//!
//! DFPWM bodies are small (6 KB per second of audio), so whole tracks are
//! cached as single blobs keyed by URL in a host [`BlobStore`](bridge_traits::BlobStore).
//! A cached body is replayed through the decoder in chunks, which yields
//! exactly the samples a network read would have produced.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │     TrackCache       │
//! │  - lookup()          │
//! │  - store()           │
//! │  - evict() / clear() │
//! └────────┬─────────────┘
//!          ├──> BlobStore (host storage)
//!          └──> EventBus (Hit / Stored / Evicted)
//! ```
//!
//! Cache failures never fail playback; they are logged and treated as a miss.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, TrackCache};
//!
//! let cache = TrackCache::new(store, CacheConfig::default().with_max_entries(32));
//! if let Some(body) = cache.lookup(url).await {
//!     println!("{} bytes cached", body.len());
//! }
//! ```

pub mod config;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use manager::TrackCache;
pub use stats::CacheStats;
