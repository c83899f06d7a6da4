//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the DFPWM player crates:
//! - Logging and tracing setup, with optional forwarding to a host `LoggerSink`
//! - `CoreConfig` builder holding the injected bridges
//! - Event bus for playback and cache notifications
//!
//! ## Overview
//!
//! Nothing in this crate decodes audio. It establishes the logging conventions,
//! the dependency-injection surface, and the broadcast channel that
//! `core-playback` builds on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
