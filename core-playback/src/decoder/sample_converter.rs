//! # Sample Format Converter
//!
//! Helpers for sinks that need hard-bounded or integer PCM.
//!
//! Decoded samples are nominally in `[-1.0, 1.0]`; the decoder never clamps.
//! Consumers that need a guaranteed bound clamp here.

use tracing::warn;

/// Converts decoded `f32` samples for downstream consumers.
pub struct SampleConverter;

impl SampleConverter {
    /// Clamp one sample into `[-1.0, 1.0]`. NaN maps to silence.
    pub fn clamp_f32(sample: f32) -> f32 {
        if sample.is_nan() {
            0.0
        } else {
            sample.clamp(-1.0, 1.0)
        }
    }

    /// Clamp every sample in place.
    pub fn clamp_samples(samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = Self::clamp_f32(*sample);
        }
    }

    /// Clamp then scale to signed 16-bit PCM.
    pub fn to_i16(sample: f32) -> i16 {
        (Self::clamp_f32(sample) * i16::MAX as f32).round() as i16
    }

    /// Convert a whole buffer to signed 16-bit PCM.
    pub fn to_i16_vec(samples: &[f32]) -> Vec<i16> {
        samples.iter().map(|&s| Self::to_i16(s)).collect()
    }

    /// Count samples outside `[-1.0, 1.0]`, warning if any are found.
    pub fn validate_samples(samples: &[f32]) -> usize {
        let clipped = samples.iter().filter(|s| !(-1.0..=1.0).contains(*s)).count();

        if clipped > 0 {
            warn!(
                clipped,
                total = samples.len(),
                "Samples outside [-1.0, 1.0]"
            );
        }

        clipped
    }
}
