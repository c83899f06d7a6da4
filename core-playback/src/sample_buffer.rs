//! # Growing PCM Sample Buffer
//!
//! Shared, append-only buffer that accumulates one track's decoded samples in
//! stream order.
//!
//! ## Design
//!
//! - **Sharing**: cheap `Clone`; all clones see the same samples
//! - **Locking**: `parking_lot::RwLock`, held only for the copy in or out
//! - **Completion**: once [`mark_complete`](SampleBuffer::mark_complete) is called
//!   the buffer is frozen and further appends are rejected
//!
//! ## Usage
//!
//! ```rust
//! use core_playback::SampleBuffer;
//!
//! let buffer = SampleBuffer::new(48_000);
//! buffer.append(&[0.1, 0.2]);
//!
//! // A progressive consumer reads from its own cursor.
//! let mut out = [0.0f32; 4];
//! assert_eq!(buffer.read_at(0, &mut out), 2);
//!
//! buffer.mark_complete();
//! assert!(!buffer.append(&[0.3]));
//! ```

use bridge_traits::PcmBuffer;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::decoder::duration_for_samples;

#[derive(Debug, Default)]
struct Inner {
    samples: Vec<f32>,
    complete: bool,
}

/// Accumulating mono PCM for the current track.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    inner: Arc<RwLock<Inner>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_capacity(sample_rate, 0)
    }

    /// Create a buffer pre-allocated for `capacity` samples.
    pub fn with_capacity(sample_rate: u32, capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                samples: Vec::with_capacity(capacity),
                complete: false,
            })),
            sample_rate,
        }
    }

    /// Append samples in stream order.
    ///
    /// Returns `false` (and appends nothing) if the buffer is already complete.
    pub fn append(&self, samples: &[f32]) -> bool {
        let mut inner = self.inner.write();
        if inner.complete {
            return false;
        }
        inner.samples.extend_from_slice(samples);
        true
    }

    /// Freeze the buffer. Idempotent.
    pub fn mark_complete(&self) {
        self.inner.write().complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.inner.read().complete
    }

    pub fn len(&self) -> usize {
        self.inner.read().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playing time of the samples accumulated so far.
    pub fn duration(&self) -> Duration {
        duration_for_samples(self.len(), self.sample_rate)
    }

    /// Copy samples starting at `offset` into `out`, returning how many were copied.
    pub fn read_at(&self, offset: usize, out: &mut [f32]) -> usize {
        let inner = self.inner.read();
        let available = inner.samples.len().saturating_sub(offset);
        let count = available.min(out.len());
        if count > 0 {
            out[..count].copy_from_slice(&inner.samples[offset..offset + count]);
        }
        count
    }

    /// Copy of everything accumulated so far.
    pub fn snapshot(&self) -> Vec<f32> {
        self.inner.read().samples.clone()
    }

    /// Package the current contents for an [`AudioSink`](bridge_traits::AudioSink).
    pub fn to_pcm(&self) -> PcmBuffer {
        PcmBuffer::new(self.snapshot(), self.sample_rate)
    }

    /// Returns `true` if both handles share the same storage.
    pub fn ptr_eq(&self, other: &SampleBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
