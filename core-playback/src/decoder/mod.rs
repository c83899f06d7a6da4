//! # DFPWM Decoder Module
//!
//! Streaming decoder for DFPWM1a, a one-bit-per-sample delta modulation format.
//!
//! ## Overview
//!
//! Each input bit drives an adaptive integrator toward one of two rails, and the
//! integrator output is smoothed by a fixed low-pass filter. The filter state is
//! carried across calls, so a track can be decoded chunk by chunk as bytes
//! arrive and the output is identical to decoding the whole body at once.
//!
//! ```text
//! bytes ─► bits (LSB first) ─► integrator ─► transition blend ─► low-pass ─► f32 PCM
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use core_playback::decoder::{DfpwmDecoder, SAMPLES_PER_BYTE};
//!
//! let mut decoder = DfpwmDecoder::new();
//! let first = decoder.decode(&[0x00, 0xFF]);
//! let rest = decoder.decode(&[0xA5]);
//! assert_eq!(first.len() + rest.len(), 3 * SAMPLES_PER_BYTE);
//! ```
//!
//! ## Threading Model
//!
//! A [`DfpwmDecoder`] is a plain value owned by one stream. Independent streams
//! use independent decoders and can decode in parallel.

mod dfpwm;
mod sample_converter;

pub use dfpwm::{
    decode_all, decode_with_state, duration_for_samples, samples_for_bytes, DecoderState,
    DfpwmDecoder, LPF_STRENGTH, MAX_RESPONSE, MIN_RESPONSE, RESP_HALF, RESP_PREC,
    SAMPLES_PER_BYTE, SAMPLE_RATE, SCALE,
};
pub use sample_converter::SampleConverter;
