//! DFPWM1a bit-level decoding.

use std::time::Duration;

/// Fixed-point precision of the adaptive response.
pub const RESP_PREC: i32 = 10;
/// Low-pass filter strength, out of 256.
pub const LPF_STRENGTH: i32 = 140;
/// Lower bound of the response, enforced after every bit.
pub const MIN_RESPONSE: i32 = 2 << (RESP_PREC - 8);
pub const MAX_RESPONSE: i32 = (1 << RESP_PREC) - 1;
/// Rounding term for the integrator step.
pub const RESP_HALF: i32 = 1 << (RESP_PREC - 1);
/// Converts the low-pass level to a sample.
pub const SCALE: f32 = 1.0 / 128.0;
pub const SAMPLES_PER_BYTE: usize = 8;
/// Reference playback rate: one encoded bit per sample at 48 kHz.
pub const SAMPLE_RATE: u32 = 48_000;

const TARGET_HIGH: i32 = 127;
const TARGET_LOW: i32 = -128;

/// Number of samples produced by `bytes` bytes of DFPWM.
pub const fn samples_for_bytes(bytes: usize) -> usize {
    bytes * SAMPLES_PER_BYTE
}

/// Playing time of `samples` samples at `sample_rate`. Zero if the rate is zero.
pub fn duration_for_samples(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(samples as f64 / sample_rate as f64)
}

/// Filter state threaded from one bit to the next.
///
/// `Default` is the start-of-stream state: everything zero, `last_bit` clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DecoderState {
    /// Adaptive integrator gain, in `[MIN_RESPONSE, MAX_RESPONSE]` after the first bit.
    pub response: i32,
    /// Integrator output.
    pub level: i32,
    pub last_bit: bool,
    /// Integrator output of the previous bit, used to smooth polarity flips.
    pub filtered_last_level: i32,
    /// Low-pass output; `low_pass_level * SCALE` is the emitted sample.
    pub low_pass_level: i32,
}

impl DecoderState {
    /// Advance by one bit and return the new low-pass level.
    #[inline]
    fn step(&mut self, bit: bool) -> i32 {
        let target = if bit { TARGET_HIGH } else { TARGET_LOW };

        let mut level =
            self.level + ((self.response * (target - self.level) + RESP_HALF) >> RESP_PREC);
        // Integrator stall: nudge one unit so it keeps moving toward the rail.
        if level == self.level && level != target {
            level += if bit { 1 } else { -1 };
        }

        let same = bit == self.last_bit;
        let response_target = if same { MAX_RESPONSE } else { 0 };
        if self.response != response_target {
            self.response += if same { 1 } else { -1 };
        }
        self.response = self.response.clamp(MIN_RESPONSE, MAX_RESPONSE);

        let blend = if same {
            level
        } else {
            (self.filtered_last_level + level + 1) >> 1
        };
        self.filtered_last_level = level;
        self.level = level;

        self.low_pass_level += (LPF_STRENGTH * (blend - self.low_pass_level) + 0x80) >> 8;
        self.last_bit = bit;

        self.low_pass_level
    }

    /// Decode `input`, appending one sample per bit to `out`.
    fn decode_into(&mut self, input: &[u8], out: &mut Vec<f32>) {
        out.reserve(samples_for_bytes(input.len()));
        for &byte in input {
            for shift in 0..SAMPLES_PER_BYTE {
                let bit = (byte >> shift) & 1 == 1;
                out.push(self.step(bit) as f32 * SCALE);
            }
        }
    }
}

/// Streaming DFPWM1a decoder for one logical stream.
///
/// Create one per track and drop it when the track ends or is abandoned; its
/// state encodes that track's history.
#[derive(Debug, Clone, Default)]
pub struct DfpwmDecoder {
    state: DecoderState,
}

impl DfpwmDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume decoding from a previously captured state.
    pub fn with_state(state: DecoderState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Return to the start-of-stream state.
    pub fn reset(&mut self) {
        self.state = DecoderState::default();
    }

    /// Decode the next chunk of the stream.
    ///
    /// Returns exactly `8 * chunk.len()` samples. An empty chunk returns an
    /// empty vector and leaves the state untouched.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<f32> {
        let mut out = Vec::with_capacity(samples_for_bytes(chunk.len()));
        self.state.decode_into(chunk, &mut out);
        out
    }

    /// Like [`decode`](Self::decode) but appends to a caller-owned buffer.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut Vec<f32>) {
        self.state.decode_into(chunk, out);
    }
}

/// Decode `input` starting from `state`, returning the state to continue from.
pub fn decode_with_state(mut state: DecoderState, input: &[u8]) -> (DecoderState, Vec<f32>) {
    let mut out = Vec::with_capacity(samples_for_bytes(input.len()));
    state.decode_into(input, &mut out);
    (state, out)
}

/// Decode a complete stream from the start-of-stream state.
pub fn decode_all(input: &[u8]) -> Vec<f32> {
    decode_with_state(DecoderState::default(), input).1
}
