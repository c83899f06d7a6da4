//! Playback bridge traits and supporting audio types.
//!
//! The core hands a complete, decoded mono PCM buffer to an [`AudioSink`]; the
//! sink owns actual sound rendering, pause/resume, and position tracking.
//! Host applications provide concrete implementations for their platform audio
//! engine.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Decoded mono PCM handed to an [`AudioSink`].
///
/// Samples are nominally in `[-1.0, 1.0]`; sinks that need a hard bound must
/// clamp on their side.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Mono `f32` samples, in stream order.
    pub samples: Arc<[f32]>,
    /// Sample rate in hertz.
    pub sample_rate: u32,
}

impl PcmBuffer {
    /// Create a new PCM buffer.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total playing time, `len / sample_rate`.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Sink lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Nothing loaded.
    Idle,
    /// A buffer is loaded but not playing.
    Loaded,
    Playing,
    Paused,
    Stopped,
}

/// Audio output that renders decoded PCM.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::{AudioSink, PcmBuffer};
///
/// async fn start(sink: &dyn AudioSink, buffer: PcmBuffer) -> Result<()> {
///     sink.load(buffer).await?;
///     sink.play().await
/// }
/// ```
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Replace whatever is loaded with `buffer`. Playback does not start until
    /// [`play`](AudioSink::play) is called.
    async fn load(&self, buffer: PcmBuffer) -> Result<()>;

    /// Begin or resume playback of the loaded buffer.
    async fn play(&self) -> Result<()>;

    /// Pause playback without discarding the loaded buffer.
    async fn pause(&self) -> Result<()>;

    /// Stop playback and discard the loaded buffer. Stopping an idle sink is a no-op.
    async fn stop(&self) -> Result<()>;

    /// Time played so far in the loaded buffer.
    async fn elapsed(&self) -> Result<Duration>;

    /// Current sink state.
    async fn state(&self) -> Result<SinkState>;
}
