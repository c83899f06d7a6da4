//! # Streaming Configuration
//!
//! Configuration, state and statistics types for the playback pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::decoder::SAMPLE_RATE;

/// Upper bound for [`StreamingConfig::initial_capacity_secs`].
const MAX_INITIAL_CAPACITY_SECS: u32 = 3600;

/// Playback pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Rate attached to decoded buffers handed to the sink.
    ///
    /// Default: 48000 Hz (one encoded bit per sample).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Start the sink as soon as a track finishes decoding.
    ///
    /// Default: true.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    /// Seconds of audio to pre-allocate in a new track buffer.
    ///
    /// Only an allocation hint; longer tracks grow the buffer as needed.
    /// Default: 30 seconds.
    #[serde(default = "default_initial_capacity_secs")]
    pub initial_capacity_secs: u32,

    /// Longest wait for the next chunk before the read counts as a transport failure.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            autoplay: default_autoplay(),
            initial_capacity_secs: default_initial_capacity_secs(),
            read_timeout: default_read_timeout(),
        }
    }
}

impl StreamingConfig {
    /// Decode only; never start the sink automatically.
    pub fn manual_start() -> Self {
        Self {
            autoplay: false,
            ..Default::default()
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample_rate must be > 0".to_string());
        }

        if self.initial_capacity_secs > MAX_INITIAL_CAPACITY_SECS {
            return Err(format!(
                "initial_capacity_secs cannot exceed {}",
                MAX_INITIAL_CAPACITY_SECS
            ));
        }

        if self.read_timeout.is_zero() {
            return Err("read_timeout must be > 0".to_string());
        }

        Ok(())
    }

    /// Number of samples to pre-allocate for a new track.
    pub fn initial_capacity_samples(&self) -> usize {
        self.initial_capacity_secs as usize * self.sample_rate as usize
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_sample_rate() -> u32 {
    SAMPLE_RATE
}

fn default_autoplay() -> bool {
    true
}

fn default_initial_capacity_secs() -> u32 {
    30
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(30)
}

// ============================================================================
// Streaming State
// ============================================================================

/// State of the pipeline's current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamingState {
    /// No track requested yet, or the last request was aborted.
    Idle,
    /// Opening the byte stream.
    Buffering,
    /// Reading and decoding chunks.
    Streaming,
    /// All bytes decoded; the buffer is complete.
    Completed,
    /// The completed buffer was handed to the sink and started.
    Playing,
    /// Stopped explicitly.
    Stopped,
    /// The transport failed; the partial buffer was discarded.
    Error,
}

impl StreamingState {
    /// Returns `true` while a request is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Buffering | Self::Streaming)
    }

    /// Returns `true` once the current track can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Playing | Self::Error)
    }
}

/// Counters accumulated over the pipeline's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingStats {
    pub tracks_requested: u64,
    pub tracks_completed: u64,
    /// Requests replaced by a newer request or an abort before completing.
    pub tracks_superseded: u64,
    pub tracks_failed: u64,
    /// Completed requests served from the offline cache.
    pub cache_hits: u64,
    /// Compressed bytes read from byte streams (network or cache).
    pub total_bytes_received: u64,
    /// Samples appended to a current-track buffer.
    pub total_samples_decoded: u64,
    /// Decoded chunks discarded because their request was no longer current.
    pub stale_chunks_dropped: u64,
}

impl StreamingStats {
    /// Fraction of requests that completed, `0.0` when nothing was requested.
    pub fn completion_rate(&self) -> f64 {
        if self.tracks_requested == 0 {
            return 0.0;
        }
        self.tracks_completed as f64 / self.tracks_requested as f64
    }
}
