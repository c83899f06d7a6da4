//! # Playback & Streaming Module
//!
//! DFPWM1a decoding and the single-track streaming pipeline around it.
//!
//! ## Overview
//!
//! This module handles:
//! - Bit-exact DFPWM1a decoding with state threaded across chunk boundaries
//! - Incremental fetch, decode and accumulation of one current track
//! - Generation-id cancellation when a newer track is requested
//! - Optional read-through cache of compressed tracks (feature `offline-cache`)
//!
//! ## Quick Start
//!
//! ```rust
//! use core_playback::{decode_all, DfpwmDecoder};
//!
//! let body = [0x00u8, 0xFF, 0xA5, 0x3C];
//!
//! let mut decoder = DfpwmDecoder::new();
//! let mut streamed = decoder.decode(&body[..1]);
//! streamed.extend(decoder.decode(&body[1..]));
//!
//! assert_eq!(streamed, decode_all(&body));
//! assert_eq!(streamed.len(), body.len() * 8);
//! ```

#[cfg(feature = "offline-cache")]
pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod sample_buffer;
pub mod streaming;

pub use bridge_traits::PcmBuffer;
pub use config::{StreamingConfig, StreamingState, StreamingStats};
pub use decoder::{
    decode_all, decode_with_state, duration_for_samples, samples_for_bytes, DecoderState,
    DfpwmDecoder, SampleConverter, SAMPLES_PER_BYTE, SAMPLE_RATE,
};
pub use error::{PlaybackError, Result};
pub use sample_buffer::SampleBuffer;
pub use streaming::{PlaybackOutcome, PlaybackPipeline};

#[cfg(feature = "offline-cache")]
pub use cache::{CacheConfig, CacheStats, TrackCache};
