//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates (`core-playback`, `core-runtime`,
//! `bridge-traits`, and the desktop bridges) so host applications can depend on
//! `dfpwm-player-workspace` and enable the documented features without wiring
//! each crate individually.
//!
//! ## Features
//!
//! - `desktop-shims` (default): desktop bridge implementations (`reqwest`
//!   streaming, filesystem blob store) and their use as `CoreConfig` defaults.
//! - `offline-cache` (default): read-through cache of compressed track bytes.

pub use bridge_traits as bridges;
pub use core_playback as playback;
pub use core_runtime as runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;

pub use core_playback::{
    decode_all, DecoderState, DfpwmDecoder, PcmBuffer, PlaybackError, PlaybackOutcome,
    PlaybackPipeline, SampleBuffer, StreamingConfig,
};
