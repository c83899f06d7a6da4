//! # Core Configuration Module
//!
//! Builder-style configuration holding the host bridges the player runs on.
//!
//! ## Overview
//!
//! [`CoreConfig`] is the dependency-injection surface of the player. The builder
//! validates eagerly so a missing capability is reported at startup with an
//! actionable message instead of failing on the first track.
//!
//! ## Required Dependencies
//!
//! - `AudioSink` - renders decoded PCM; there is no default
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `ByteSource` - opens track byte streams (desktop default: `ReqwestByteSource`)
//! - `BlobStore` - offline cache storage (desktop default: `FsBlobStore`), only
//!   needed while the offline cache is enabled
//!
//! Desktop defaults are injected only when the `desktop-shims` feature is enabled.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .audio_sink(Arc::new(MySink::default()))
//!     .cache_dir("/var/cache/dfpwm-player")
//!     .event_buffer_size(256)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioSink, BlobStore, ByteSource};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for the event channel; larger values only waste memory.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Audio output (required)
    pub audio_sink: Arc<dyn AudioSink>,

    /// Source of compressed track bytes
    pub byte_source: Arc<dyn ByteSource>,

    /// Storage for the offline track cache, present when the cache is enabled
    pub blob_store: Option<Arc<dyn BlobStore>>,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("has_blob_store", &self.blob_store.is_some())
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Optional behaviour toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Serve repeat plays from the blob store and store completed downloads.
    pub enable_offline_cache: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_offline_cache: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks value ranges and feature/bridge consistency.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_offline_cache && self.blob_store.is_none() {
            return Err(Error::Config(
                "Offline cache enabled but no BlobStore provided. \
                 Disable the feature or inject a BlobStore implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn audio_sink_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioSink".to_string(),
        message: "AudioSink implementation is required to render decoded audio. \
                  Inject the host's audio output with .audio_sink()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_byte_source() -> Result<Arc<dyn ByteSource>> {
    use bridge_desktop::ReqwestByteSource;

    let source: Arc<dyn ByteSource> = Arc::new(ReqwestByteSource::new());
    Ok(source)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_byte_source() -> Result<Arc<dyn ByteSource>> {
    Err(Error::CapabilityMissing {
        capability: "ByteSource".to_string(),
        message: "ByteSource implementation is required to fetch tracks. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestByteSource. \
                  Other hosts: inject a platform stream source with .byte_source()."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_blob_store(cache_dir: Option<PathBuf>) -> Result<Arc<dyn BlobStore>> {
    use bridge_desktop::FsBlobStore;

    let store = match cache_dir {
        Some(dir) => FsBlobStore::with_root(dir),
        None => FsBlobStore::new(),
    };
    let store: Arc<dyn BlobStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_blob_store(_cache_dir: Option<PathBuf>) -> Result<Arc<dyn BlobStore>> {
    Err(Error::CapabilityMissing {
        capability: "BlobStore".to_string(),
        message: "BlobStore implementation is required while the offline cache is enabled. \
                  Desktop: enable the 'desktop-shims' feature to use FsBlobStore. \
                  Otherwise inject one with .blob_store() or call .enable_offline_cache(false)."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    audio_sink: Option<Arc<dyn AudioSink>>,
    byte_source: Option<Arc<dyn ByteSource>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    cache_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the audio output (required).
    pub fn audio_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.audio_sink = Some(sink);
        self
    }

    /// Sets the byte source, overriding the desktop default.
    pub fn byte_source(mut self, source: Arc<dyn ByteSource>) -> Self {
        self.byte_source = Some(source);
        self
    }

    /// Sets the blob store used by the offline cache.
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Directory for the default desktop blob store. Ignored when a store is injected.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_offline_cache(mut self, enabled: bool) -> Self {
        self.features.enable_offline_cache = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if no `AudioSink` was injected, or a
    ///   `ByteSource`/`BlobStore` is needed and no desktop default is available
    /// - [`Error::Config`] if a value is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let audio_sink = self.audio_sink.ok_or_else(audio_sink_missing_error)?;

        let byte_source = match self.byte_source {
            Some(source) => source,
            None => provide_default_byte_source()?,
        };

        let blob_store = match (self.blob_store, self.features.enable_offline_cache) {
            (Some(store), _) => Some(store),
            (None, true) => Some(provide_default_blob_store(self.cache_dir)?),
            (None, false) => None,
        };

        let config = CoreConfig {
            audio_sink,
            byte_source,
            blob_store,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
