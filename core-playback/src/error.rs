//! # Playback Error Types
//!
//! Errors surfaced by the streaming pipeline. Decoding itself cannot fail, and
//! a superseded request is reported as an outcome rather than an error.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The byte stream could not be opened or failed mid-read.
    #[error("Transport error for {url}: {source}")]
    Transport {
        /// Redacted track URL.
        url: String,
        #[source]
        source: BridgeError,
    },

    /// No byte source can serve this URL.
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    // ========================================================================
    // Output Errors
    // ========================================================================
    /// The audio sink rejected the decoded buffer or a control call.
    #[error("Audio sink error: {0}")]
    Sink(#[source] BridgeError),

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    // ========================================================================
    // Cache & Configuration Errors
    // ========================================================================
    /// Offline cache operation failed.
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Transport { source, .. } => match source {
                BridgeError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
                BridgeError::Timeout(_) | BridgeError::OperationFailed(_) | BridgeError::Io(_) => true,
                BridgeError::NotAvailable(_) => false,
            },
            PlaybackError::SourceUnavailable(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error is due to the transport.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Transport { .. } | PlaybackError::SourceUnavailable(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
